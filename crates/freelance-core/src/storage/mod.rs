//! Client-side persistence.
//!
//! `KvStore` is the port; `MemoryKvStore` is the session-scoped backend that
//! lives for the process, and the durable backend lives in freelance-infra.
//! `StorageSelector` picks between the two per call.

pub mod box_store;
pub mod kv_store;
pub mod memory;
pub mod selector;

pub use box_store::BoxKvStore;
pub use kv_store::KvStore;
pub use memory::MemoryKvStore;
pub use selector::{StorageScope, StorageSelector};

/// Persisted auth session (user, tokens).
pub const AUTH_SESSION_KEY: &str = "auth-session";

/// Durable remember-me flag; selects the scope of `AUTH_SESSION_KEY`.
pub const AUTH_REMEMBER_KEY: &str = "auth-remember";

/// Durable login email offered back after a remember-me login; kept across
/// logout.
pub const AUTH_REMEMBERED_EMAIL_KEY: &str = "auth-remembered-email";

/// Durable listing preferences (favorites, view mode, filters, sort).
pub const SERVICES_PREFERENCES_KEY: &str = "services-preferences";
