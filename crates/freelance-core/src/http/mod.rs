//! HTTP plumbing: request/response types, the transport port and the
//! `ApiClient` wrapper that adds bearer auth and refresh-and-retry.

pub mod client;
pub mod request;
pub mod transport;

pub use client::{ApiClient, TOKEN_REFRESH_PATH};
pub use request::{
    HttpMethod, HttpRequest, HttpResponse, ProgressFn, RequestBody, RequestDescriptor, UploadPart,
};
pub use transport::HttpTransport;
