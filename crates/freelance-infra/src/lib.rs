//! Infrastructure layer for the freelance marketplace client.
//!
//! Contains implementations of the ports defined in `freelance-core`: the
//! reqwest HTTP transport, the file-backed durable key-value store, plus
//! config loading and data directory resolution.

pub mod config;
pub mod http;
pub mod storage;

pub use config::{load_client_config, resolve_data_dir};
pub use http::ReqwestTransport;
pub use storage::FileKvStore;
