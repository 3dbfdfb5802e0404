//! Durable client-side storage.

pub mod file_kv;

pub use file_kv::FileKvStore;
