//! Runtime selection between durable and session-scoped storage.
//!
//! The scope is resolved on every read and write from the remember-me flag,
//! which itself always lives in durable storage.

use serde::Serialize;
use serde::de::DeserializeOwned;

use freelance_types::error::StorageError;

use super::AUTH_REMEMBER_KEY;
use super::box_store::BoxKvStore;

/// Where a value is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
    /// Survives restarts.
    Durable,
    /// Lives only as long as the current process.
    Session,
}

#[derive(Clone)]
pub struct StorageSelector {
    durable: BoxKvStore,
    session: BoxKvStore,
}

impl StorageSelector {
    pub fn new(durable: BoxKvStore, session: BoxKvStore) -> Self {
        Self { durable, session }
    }

    pub async fn remember_me(&self) -> Result<bool, StorageError> {
        Ok(self
            .durable
            .get(AUTH_REMEMBER_KEY)
            .await?
            .is_some_and(|v| v == "true"))
    }

    pub async fn set_remember_me(&self, remember: bool) -> Result<(), StorageError> {
        if remember {
            self.durable.set(AUTH_REMEMBER_KEY, "true".to_string()).await
        } else {
            self.durable.remove(AUTH_REMEMBER_KEY).await
        }
    }

    /// Scope currently selected by the remember-me flag.
    pub async fn scope(&self) -> Result<StorageScope, StorageError> {
        if self.remember_me().await? {
            Ok(StorageScope::Durable)
        } else {
            Ok(StorageScope::Session)
        }
    }

    fn backend(&self, scope: StorageScope) -> &BoxKvStore {
        match scope {
            StorageScope::Durable => &self.durable,
            StorageScope::Session => &self.session,
        }
    }

    /// Read a JSON value from the currently selected scope.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let scope = self.scope().await?;
        read_json(self.backend(scope), key).await
    }

    /// Write a JSON value to the selected scope and drop any stale copy from
    /// the other one.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let scope = self.scope().await?;
        let (target, other) = match scope {
            StorageScope::Durable => (&self.durable, &self.session),
            StorageScope::Session => (&self.session, &self.durable),
        };
        write_json(target, key, value).await?;
        other.remove(key).await
    }

    /// Remove a key from both scopes.
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.durable.remove(key).await?;
        self.session.remove(key).await
    }

    /// Read a JSON value that always lives in durable storage.
    pub async fn get_durable_json<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        read_json(&self.durable, key).await
    }

    /// Write a JSON value that always lives in durable storage.
    pub async fn set_durable_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        write_json(&self.durable, key, value).await
    }

    pub async fn remove_durable(&self, key: &str) -> Result<(), StorageError> {
        self.durable.remove(key).await
    }
}

async fn read_json<T: DeserializeOwned>(
    store: &BoxKvStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

async fn write_json<T: Serialize>(
    store: &BoxKvStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Serialize {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set(key, raw).await
}
