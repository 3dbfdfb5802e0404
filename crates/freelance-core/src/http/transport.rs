//! HTTP transport trait.
//!
//! The transport performs exactly one round trip. Bearer injection policy,
//! status mapping and refresh-and-retry live in `ApiClient`.
//! The reqwest implementation lives in freelance-infra.

use secrecy::SecretString;

use freelance_types::error::TransportError;

use super::request::{HttpRequest, HttpResponse};

/// Trait for sending a single request to the backend.
///
/// Returns `Err` only when no response was received; every HTTP status,
/// including 4xx/5xx, is an `Ok(HttpResponse)`.
pub trait HttpTransport: Send + Sync {
    fn send(
        &self,
        request: &HttpRequest,
        bearer: Option<&SecretString>,
    ) -> impl std::future::Future<Output = Result<HttpResponse, TransportError>> + Send;
}
