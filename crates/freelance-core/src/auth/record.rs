//! The persisted form of an auth session (`auth-session` key).

use serde::{Deserialize, Serialize};

use freelance_types::error::StorageError;
use freelance_types::user::User;

use crate::storage::{AUTH_SESSION_KEY, StorageSelector};

/// Snapshot written to the storage scope selected by the remember-me flag.
///
/// Tokens are stored in plain form here; this is the only place they leave
/// `SecretString`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl SessionRecord {
    pub async fn load(storage: &StorageSelector) -> Result<Option<Self>, StorageError> {
        storage.get_json(AUTH_SESSION_KEY).await
    }

    pub async fn save(&self, storage: &StorageSelector) -> Result<(), StorageError> {
        storage.set_json(AUTH_SESSION_KEY, self).await
    }

    /// Read-modify-write of the current record (default when absent).
    pub async fn update<F>(storage: &StorageSelector, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut SessionRecord),
    {
        let mut record = Self::load(storage).await?.unwrap_or_default();
        f(&mut record);
        record.is_authenticated = record.user.is_some() && record.access_token.is_some();
        record.save(storage).await
    }

    /// Remove the record from both scopes.
    pub async fn clear(storage: &StorageSelector) -> Result<(), StorageError> {
        storage.remove(AUTH_SESSION_KEY).await
    }
}
