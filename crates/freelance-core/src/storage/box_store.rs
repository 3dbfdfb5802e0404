//! BoxKvStore -- object-safe dynamic dispatch wrapper for KvStore.
//!
//! 1. Define an object-safe `KvStoreDyn` trait with boxed futures
//! 2. Blanket-impl `KvStoreDyn` for all `T: KvStore`
//! 3. `BoxKvStore` wraps `Arc<dyn KvStoreDyn>` and delegates

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use freelance_types::error::StorageError;

use super::kv_store::KvStore;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// Object-safe version of [`KvStore`] with boxed futures.
pub trait KvStoreDyn: Send + Sync {
    fn get_boxed<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<String>>;

    fn set_boxed<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, ()>;

    fn remove_boxed<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()>;
}

impl<T: KvStore> KvStoreDyn for T {
    fn get_boxed<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(self.get(key))
    }

    fn set_boxed<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, ()> {
        Box::pin(self.set(key, value))
    }

    fn remove_boxed<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(self.remove(key))
    }
}

/// Type-erased, cheaply cloneable key-value store.
///
/// Lets the storage selector hold a durable and a session-scoped backend of
/// different concrete types.
#[derive(Clone)]
pub struct BoxKvStore {
    inner: Arc<dyn KvStoreDyn>,
}

impl BoxKvStore {
    pub fn new<T: KvStore + 'static>(store: T) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_boxed(key).await
    }

    pub async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.inner.set_boxed(key, value).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove_boxed(key).await
    }
}
