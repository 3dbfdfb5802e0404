//! Shared token pair.
//!
//! The vault is the only cross-cutting mutable state: the API client reads
//! the access token per request and writes it during refresh, the auth store
//! writes both tokens on login and clears them on logout. Every change is
//! mirrored into the persisted session record.

use std::sync::RwLock;

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use freelance_types::error::StorageError;

use super::record::SessionRecord;
use crate::storage::StorageSelector;

#[derive(Default)]
struct TokenState {
    access: Option<SecretString>,
    refresh: Option<SecretString>,
    /// Bumped on every change so concurrent 401 handlers can tell whether
    /// someone else already refreshed.
    generation: u64,
}

pub struct TokenVault {
    storage: StorageSelector,
    state: RwLock<TokenState>,
}

fn duplicate(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

impl TokenVault {
    pub fn new(storage: StorageSelector) -> Self {
        Self {
            storage,
            state: RwLock::new(TokenState::default()),
        }
    }

    pub fn storage(&self) -> &StorageSelector {
        &self.storage
    }

    pub fn access(&self) -> Option<SecretString> {
        self.read(|s| s.access.as_ref().map(duplicate))
    }

    pub fn refresh(&self) -> Option<SecretString> {
        self.read(|s| s.refresh.as_ref().map(duplicate))
    }

    pub fn has_access(&self) -> bool {
        self.read(|s| s.access.is_some())
    }

    pub fn has_refresh(&self) -> bool {
        self.read(|s| s.refresh.is_some())
    }

    pub fn generation(&self) -> u64 {
        self.read(|s| s.generation)
    }

    /// Install a fresh token pair (login, register, social login).
    pub async fn store(&self, access: SecretString, refresh: SecretString) {
        let (access_raw, refresh_raw) = (
            access.expose_secret().to_owned(),
            refresh.expose_secret().to_owned(),
        );
        self.write(|s| {
            s.access = Some(access);
            s.refresh = Some(refresh);
        });
        self.persist(move |r| {
            r.access_token = Some(access_raw);
            r.refresh_token = Some(refresh_raw);
        })
        .await;
    }

    /// Replace the access token after a refresh; the refresh token only
    /// changes when the backend rotated it.
    pub async fn replace_access(&self, access: SecretString, refresh: Option<SecretString>) {
        let access_raw = access.expose_secret().to_owned();
        let refresh_raw = refresh.as_ref().map(|r| r.expose_secret().to_owned());
        self.write(|s| {
            s.access = Some(access);
            if let Some(refresh) = refresh {
                s.refresh = Some(refresh);
            }
        });
        self.persist(move |r| {
            r.access_token = Some(access_raw);
            if let Some(refresh) = refresh_raw {
                r.refresh_token = Some(refresh);
            }
        })
        .await;
    }

    /// Drop both tokens and the persisted session record.
    pub async fn clear(&self) {
        self.write(|s| {
            s.access = None;
            s.refresh = None;
        });
        if let Err(e) = SessionRecord::clear(&self.storage).await {
            warn!(error = %e, "failed to clear persisted session");
        }
    }

    /// Load tokens from a persisted record without writing back.
    pub fn load(&self, record: &SessionRecord) {
        let access = record.access_token.clone().map(SecretString::from);
        let refresh = record.refresh_token.clone().map(SecretString::from);
        self.write(|s| {
            s.access = access;
            s.refresh = refresh;
        });
    }

    async fn persist<F>(&self, f: F)
    where
        F: FnOnce(&mut SessionRecord),
    {
        if let Err(e) = self.try_persist(f).await {
            warn!(error = %e, "failed to persist tokens");
        }
    }

    async fn try_persist<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut SessionRecord),
    {
        SessionRecord::update(&self.storage, f).await
    }

    fn read<R>(&self, f: impl FnOnce(&TokenState) -> R) -> R {
        match self.state.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write(&self, f: impl FnOnce(&mut TokenState)) {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
        guard.generation += 1;
    }
}

impl std::fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVault")
            .field("has_access", &self.has_access())
            .field("has_refresh", &self.has_refresh())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BoxKvStore, MemoryKvStore};

    fn vault() -> TokenVault {
        TokenVault::new(StorageSelector::new(
            BoxKvStore::new(MemoryKvStore::new()),
            BoxKvStore::new(MemoryKvStore::new()),
        ))
    }

    #[tokio::test]
    async fn test_store_and_read_tokens() {
        let vault = vault();
        assert!(vault.access().is_none());

        vault
            .store(SecretString::from("a1".to_string()), SecretString::from("r1".to_string()))
            .await;
        assert_eq!(vault.access().unwrap().expose_secret(), "a1");
        assert_eq!(vault.refresh().unwrap().expose_secret(), "r1");

        let record = SessionRecord::load(vault.storage()).await.unwrap().unwrap();
        assert_eq!(record.access_token.as_deref(), Some("a1"));
        assert!(!record.is_authenticated);
    }

    #[tokio::test]
    async fn test_replace_access_keeps_refresh_unless_rotated() {
        let vault = vault();
        vault
            .store(SecretString::from("a1".to_string()), SecretString::from("r1".to_string()))
            .await;
        let before = vault.generation();

        vault.replace_access(SecretString::from("a2".to_string()), None).await;
        assert_eq!(vault.access().unwrap().expose_secret(), "a2");
        assert_eq!(vault.refresh().unwrap().expose_secret(), "r1");
        assert!(vault.generation() > before);

        vault
            .replace_access(
                SecretString::from("a3".to_string()),
                Some(SecretString::from("r3".to_string())),
            )
            .await;
        assert_eq!(vault.refresh().unwrap().expose_secret(), "r3");
    }

    #[tokio::test]
    async fn test_clear_removes_tokens_and_record() {
        let vault = vault();
        vault
            .store(SecretString::from("a".to_string()), SecretString::from("r".to_string()))
            .await;
        vault.clear().await;
        assert!(!vault.has_access());
        assert!(!vault.has_refresh());
        assert!(SessionRecord::load(vault.storage()).await.unwrap().is_none());
    }

    #[test]
    fn test_debug_does_not_leak_tokens() {
        let vault = vault();
        vault.load(&SessionRecord {
            access_token: Some("top-secret".to_string()),
            ..Default::default()
        });
        let debug = format!("{vault:?}");
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("has_access: true"));
    }
}
