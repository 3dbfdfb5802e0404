//! Session, listing and API client logic for the freelance marketplace client.
//!
//! This crate defines the "ports" (`KvStore`, `HttpTransport`) that the
//! infrastructure layer implements, plus the stores built on top of them.
//! It depends only on `freelance-types` -- never on `freelance-infra` or any
//! network/filesystem crate.

pub mod api;
pub mod auth;
pub mod event;
pub mod http;
pub mod listing;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
