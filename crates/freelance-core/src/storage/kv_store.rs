//! Key-value store trait.
//!
//! Defines the interface for client-side string storage.
//! The durable implementation lives in freelance-infra.

use freelance_types::error::StorageError;

/// Trait for client-side key-value storage.
///
/// Values are opaque strings (callers store JSON). Uses RPITIT (native async
/// fn in traits, Rust 2024 edition).
pub trait KvStore: Send + Sync {
    /// Get a value by key. Returns None if the key does not exist.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Set a value for a key (upsert).
    fn set(
        &self,
        key: &str,
        value: String,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Delete a key. No-op if the key does not exist.
    fn remove(&self, key: &str)
    -> impl std::future::Future<Output = Result<(), StorageError>> + Send;
}
