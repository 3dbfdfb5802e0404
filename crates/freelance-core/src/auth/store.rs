//! Auth session store.
//!
//! Holds the signed-in user and the UI-facing session flags. Tokens live in
//! the shared `TokenVault`; `is_authenticated` is derived from both so it can
//! never disagree with what the API client will actually send.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use freelance_types::auth::{
    AuthResponse, LoginCredentials, PasswordChange, PasswordResetConfirm, SocialAuthData,
    SocialProvider,
};
use freelance_types::error::{ApiError, ValidationErrors};
use freelance_types::event::SessionEvent;
use freelance_types::user::{User, UserPatch};

use super::record::SessionRecord;
use super::tokens::TokenVault;
use super::validation::{self, RegisterForm};
use crate::api::AuthApi;
use crate::event::SessionEventBus;
use crate::http::{ApiClient, HttpTransport};
use crate::storage::{AUTH_REMEMBERED_EMAIL_KEY, StorageSelector};

/// Coarse session status for UI branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Anonymous,
    Authenticating,
    Authenticated,
    Error,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    user: Option<User>,
    error: Option<String>,
    is_loading: bool,
    social_loading: BTreeSet<SocialProvider>,
    remembered_email: Option<String>,
}

/// Point-in-time view of the session. Carries token presence flags only;
/// the secrets themselves are read through [`AuthStore::access_token`].
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub error: Option<String>,
    pub is_loading: bool,
    pub social_loading: BTreeSet<SocialProvider>,
    pub remembered_email: Option<String>,
}

impl Session {
    pub fn status(&self) -> AuthStatus {
        if self.is_loading || !self.social_loading.is_empty() {
            AuthStatus::Authenticating
        } else if self.is_authenticated {
            AuthStatus::Authenticated
        } else if self.error.is_some() {
            AuthStatus::Error
        } else {
            AuthStatus::Anonymous
        }
    }

    pub fn is_social_loading(&self, provider: SocialProvider) -> bool {
        self.social_loading.contains(&provider)
    }
}

pub struct AuthStore<T: HttpTransport> {
    api: AuthApi<T>,
    state: RwLock<SessionState>,
}

impl<T: HttpTransport> AuthStore<T> {
    /// An empty, anonymous store. Call [`restore`](Self::restore) to pick up a
    /// persisted session.
    pub fn new(client: Arc<ApiClient<T>>) -> Self {
        Self {
            api: AuthApi::new(client),
            state: RwLock::new(SessionState::default()),
        }
    }

    fn client(&self) -> &Arc<ApiClient<T>> {
        self.api.client()
    }

    fn vault(&self) -> &Arc<TokenVault> {
        self.client().tokens()
    }

    fn storage(&self) -> &StorageSelector {
        self.vault().storage()
    }

    fn events(&self) -> &SessionEventBus {
        self.client().events()
    }

    pub fn session(&self) -> Session {
        let state = self.snapshot();
        let has_access_token = self.vault().has_access();
        Session {
            is_authenticated: state.user.is_some() && has_access_token,
            has_access_token,
            has_refresh_token: self.vault().has_refresh(),
            user: state.user,
            error: state.error,
            is_loading: state.is_loading,
            social_loading: state.social_loading,
            remembered_email: state.remembered_email,
        }
    }

    pub fn status(&self) -> AuthStatus {
        self.session().status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated
    }

    pub fn user(&self) -> Option<User> {
        self.snapshot().user
    }

    pub fn access_token(&self) -> Option<SecretString> {
        self.vault().access()
    }

    pub fn refresh_token(&self) -> Option<SecretString> {
        self.vault().refresh()
    }

    /// Rebuild the session from storage (start-up).
    ///
    /// A corrupt record is discarded rather than failing start-up.
    pub async fn restore(&self) -> Result<Session, ApiError> {
        let record = match SessionRecord::load(self.storage()).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "discarding unreadable persisted session");
                SessionRecord::clear(self.storage()).await?;
                None
            }
        };
        let remembered_email = self
            .storage()
            .get_durable_json::<String>(AUTH_REMEMBERED_EMAIL_KEY)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "ignoring unreadable remembered email");
                None
            });

        if let Some(record) = &record {
            self.vault().load(record);
        }
        let user = record.and_then(|r| r.user);
        debug!(restored = user.is_some(), "auth session restored");
        self.update(|s| {
            s.user = user;
            s.remembered_email = remembered_email;
        });
        Ok(self.session())
    }

    /// Email/password login. Durable persistence iff `remember_me`.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<User, ApiError> {
        if let Err(errors) = validation::validate_login(&credentials) {
            return self.fail(errors.into());
        }
        self.begin();
        match self.api.login(&credentials).await {
            Ok(response) => {
                let email = credentials.remember_me.then_some(credentials.email.as_str());
                Ok(self
                    .establish(response, credentials.remember_me, email, None)
                    .await)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Register and sign in. The session is kept in session-scoped storage.
    pub async fn register(&self, form: RegisterForm) -> Result<User, ApiError> {
        if let Err(errors) = validation::validate_registration(&form) {
            return self.fail(errors.into());
        }
        self.begin();
        match self.api.register(&form.data).await {
            Ok(response) => Ok(self.establish(response, false, None, None).await),
            Err(e) => self.fail(e),
        }
    }

    /// Exchange a provider authorization code for a session.
    ///
    /// Only the provider's own loading flag is raised, so several provider
    /// buttons can show independent spinners.
    pub async fn social_login(
        &self,
        provider: SocialProvider,
        data: SocialAuthData,
    ) -> Result<User, ApiError> {
        if data.code.trim().is_empty() {
            let mut errors = ValidationErrors::new();
            errors.add("code", "Authorization code is missing");
            return self.fail(errors.into());
        }
        self.update(|s| {
            s.social_loading.insert(provider);
            s.error = None;
        });
        let result = self.api.social_login(provider, &data).await;
        self.update(|s| {
            s.social_loading.remove(&provider);
        });
        match result {
            Ok(response) => Ok(self.establish(response, false, None, Some(provider)).await),
            Err(e) => self.fail(e),
        }
    }

    /// Explicit token refresh. Any failure ends the session.
    pub async fn refresh_access_token(&self) -> Result<(), ApiError> {
        if !self.vault().has_refresh() {
            self.logout().await;
            return self.fail(ApiError::SessionExpired);
        }
        match self.client().exchange_refresh_token().await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "explicit token refresh failed, ending session");
                self.logout().await;
                self.fail(ApiError::SessionExpired)
            }
        }
    }

    /// End the session. Idempotent.
    ///
    /// The server is notified only while an access token is held; that call
    /// never refreshes and its failure is ignored.
    pub async fn logout(&self) {
        if self.vault().has_access() {
            let refresh = self.vault().refresh();
            if let Err(e) = self.api.logout(refresh.as_ref()).await {
                debug!(error = %e, "logout notification failed, continuing");
            }
        }

        self.vault().clear().await;
        if let Err(e) = self.storage().set_remember_me(false).await {
            warn!(error = %e, "failed to reset remember-me flag");
        }
        self.update(|s| {
            s.user = None;
            s.error = None;
            s.is_loading = false;
            s.social_loading.clear();
        });

        self.events().publish(SessionEvent::LoggedOut);
        self.events().login_required(self.client().login_route());
        info!("logged out");
    }

    /// Shallow-merge into the current user. No-op without a user.
    pub async fn update_user(&self, patch: UserPatch) {
        let mut updated = None;
        self.update(|s| {
            if let Some(user) = s.user.as_mut() {
                user.apply_patch(patch);
                updated = Some(user.clone());
            }
        });
        if let Some(user) = updated {
            self.persist_user(user).await;
        }
    }

    /// `PATCH /auth/profile/`; the response replaces the current user.
    ///
    /// Returns `Ok(false)` without a signed-in user.
    pub async fn update_profile(&self, patch: UserPatch) -> Result<bool, ApiError> {
        if self.user().is_none() {
            return Ok(false);
        }
        let user = self.track(self.api.update_profile(&patch)).await?;
        self.update(|s| s.user = Some(user.clone()));
        self.persist_user(user).await;
        Ok(true)
    }

    /// Re-validate the session against `GET /auth/me/`.
    ///
    /// A network failure leaves the session untouched and is returned; any
    /// other failure ends the session and yields `Ok(false)`.
    pub async fn check_auth_status(&self) -> Result<bool, ApiError> {
        if !self.vault().has_access() && !self.vault().has_refresh() {
            return Ok(false);
        }
        match self.api.me().await {
            Ok(user) => {
                self.update(|s| {
                    s.user = Some(user.clone());
                    s.error = None;
                });
                self.persist_user(user).await;
                Ok(true)
            }
            Err(e) if e.is_network() => self.fail(e),
            Err(e) => {
                debug!(error = %e, "session no longer valid");
                self.logout().await;
                Ok(false)
            }
        }
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        if !validation::is_valid_email(email) {
            let mut errors = ValidationErrors::new();
            errors.add("email", "Enter a valid email address");
            return self.fail(errors.into());
        }
        self.track(self.api.request_password_reset(email)).await
    }

    pub async fn confirm_password_reset(&self, confirm: PasswordResetConfirm) -> Result<(), ApiError> {
        if let Err(errors) = check_new_password(&confirm.new_password) {
            return self.fail(errors.into());
        }
        self.track(self.api.confirm_password_reset(&confirm)).await
    }

    pub async fn change_password(&self, change: PasswordChange) -> Result<(), ApiError> {
        if let Err(errors) = check_new_password(&change.new_password) {
            return self.fail(errors.into());
        }
        self.track(self.api.change_password(&change)).await
    }

    pub async fn verify_email(&self, token: &str) -> Result<(), ApiError> {
        self.track(self.api.verify_email(token)).await?;
        let mut verified = None;
        self.update(|s| {
            if let Some(user) = s.user.as_mut() {
                user.is_verified = true;
                verified = Some(user.clone());
            }
        });
        if let Some(user) = verified {
            self.persist_user(user).await;
        }
        Ok(())
    }

    pub async fn resend_verification(&self) -> Result<(), ApiError> {
        let Some(user) = self.user() else {
            return self.fail(ApiError::InvalidRequest("not signed in".to_string()));
        };
        self.track(self.api.resend_verification(&user.email)).await
    }

    pub fn clear_error(&self) {
        self.update(|s| s.error = None);
    }

    /// Install a successful credential exchange as the current session.
    async fn establish(
        &self,
        response: AuthResponse,
        remember_me: bool,
        email: Option<&str>,
        provider: Option<SocialProvider>,
    ) -> User {
        let AuthResponse {
            access,
            refresh,
            user,
        } = response;

        // The flag selects the scope for every write that follows.
        if let Err(e) = self.storage().set_remember_me(remember_me).await {
            warn!(error = %e, "failed to persist remember-me flag");
        }
        self.vault().store(access, refresh).await;
        self.persist_user(user.clone()).await;

        let remembered = match email {
            Some(email) => {
                let email = email.to_string();
                if let Err(e) = self
                    .storage()
                    .set_durable_json(AUTH_REMEMBERED_EMAIL_KEY, &email)
                    .await
                {
                    warn!(error = %e, "failed to remember login email");
                }
                Some(email)
            }
            None if remember_me => self.snapshot().remembered_email,
            None => {
                if let Err(e) = self.storage().remove_durable(AUTH_REMEMBERED_EMAIL_KEY).await {
                    warn!(error = %e, "failed to forget login email");
                }
                None
            }
        };

        self.update(|s| {
            s.user = Some(user.clone());
            s.error = None;
            s.is_loading = false;
            s.remembered_email = remembered;
        });
        self.events().publish(SessionEvent::LoggedIn {
            user_id: user.id,
            provider,
        });
        info!(user_id = user.id, remember_me, ?provider, "signed in");
        user
    }

    async fn persist_user(&self, user: User) {
        if let Err(e) = SessionRecord::update(self.storage(), |r| r.user = Some(user)).await {
            warn!(error = %e, "failed to persist session");
        }
    }

    /// Run an action with the shared loading/error bookkeeping.
    async fn track<R>(&self, action: impl Future<Output = Result<R, ApiError>>) -> Result<R, ApiError> {
        self.begin();
        match action.await {
            Ok(value) => {
                self.update(|s| s.is_loading = false);
                Ok(value)
            }
            Err(e) => self.fail(e),
        }
    }

    fn begin(&self) {
        self.update(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    /// Record the failure for the UI and hand it back to the caller.
    fn fail<R>(&self, error: ApiError) -> Result<R, ApiError> {
        let expired = matches!(error, ApiError::SessionExpired);
        let message = error.to_string();
        self.update(|s| {
            s.is_loading = false;
            s.error = Some(message);
            if expired {
                s.user = None;
            }
        });
        Err(error)
    }

    fn snapshot(&self) -> SessionState {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut SessionState)) {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }
}

fn check_new_password(password: &SecretString) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if password.expose_secret().chars().count() < validation::MIN_PASSWORD_LEN {
        errors.add("new_password", "Password must be at least 8 characters");
    }
    errors.into_result()
}

impl<T: HttpTransport> std::fmt::Debug for AuthStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("session", &self.session())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, TOKEN_REFRESH_PATH};
    use crate::storage::{AUTH_REMEMBER_KEY, AUTH_SESSION_KEY, KvStore};
    use crate::testing::{Harness, harness};
    use freelance_types::auth::RegisterData;
    use freelance_types::user::UserType;
    use serde_json::{Value, json};

    fn user_json() -> Value {
        json!({"id": 7, "username": "li_wei", "email": "a@b.co", "first_name": "Wei", "last_name": "Li"})
    }

    fn auth_json() -> Value {
        json!({"access": "acc-1", "refresh": "ref-1", "user": user_json()})
    }

    fn store(h: &Harness) -> AuthStore<crate::testing::MockTransport> {
        AuthStore::new(Arc::clone(&h.client))
    }

    async fn signed_in(h: &Harness, remember: bool) -> AuthStore<crate::testing::MockTransport> {
        h.transport.reply(HttpMethod::Post, "/auth/login/", 200, auth_json());
        let store = store(h);
        store
            .login(LoginCredentials::new("a@b.co", "x", remember))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_login_populates_session() {
        let h = harness();
        let mut rx = h.events.subscribe();
        let store = signed_in(&h, false).await;

        let session = store.session();
        assert!(session.is_authenticated);
        assert_eq!(session.status(), AuthStatus::Authenticated);
        assert_eq!(session.user.unwrap().id, 7);
        assert!(session.error.is_none());
        assert!(!session.is_loading);
        assert_eq!(store.access_token().unwrap().expose_secret(), "acc-1");
        assert_eq!(store.refresh_token().unwrap().expose_secret(), "ref-1");

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::LoggedIn {
                user_id: 7,
                provider: None
            }
        );
        let sent = h.transport.last().unwrap();
        assert!(sent.bearer.is_none());
        assert_eq!(sent.body.unwrap()["password"], "x");
    }

    #[tokio::test]
    async fn test_session_scope_without_remember_me() {
        let h = harness();
        signed_in(&h, false).await;

        assert!(h.session.get(AUTH_SESSION_KEY).await.unwrap().is_some());
        assert!(h.durable.get(AUTH_SESSION_KEY).await.unwrap().is_none());
        assert!(h.durable.get(AUTH_REMEMBER_KEY).await.unwrap().is_none());

        let reopened = h.reopen();
        let same_process = store(&reopened);
        let session = same_process.restore().await.unwrap();
        assert!(session.is_authenticated);
        assert_eq!(session.user.unwrap().username, "li_wei");
        assert_eq!(same_process.access_token().unwrap().expose_secret(), "acc-1");

        let restarted = h.restart();
        let store = store(&restarted);
        assert!(!store.restore().await.unwrap().is_authenticated);
    }

    #[tokio::test]
    async fn test_remember_me_survives_restart() {
        let h = harness();
        signed_in(&h, true).await;
        assert!(h.durable.get(AUTH_SESSION_KEY).await.unwrap().is_some());
        assert!(h.session.get(AUTH_SESSION_KEY).await.unwrap().is_none());

        let restarted = h.restart();
        let store = store(&restarted);
        let session = store.restore().await.unwrap();

        assert!(session.is_authenticated);
        assert_eq!(session.user.unwrap().username, "li_wei");
        assert_eq!(session.remembered_email.as_deref(), Some("a@b.co"));
        assert_eq!(store.access_token().unwrap().expose_secret(), "acc-1");
    }

    #[tokio::test]
    async fn test_login_failure_records_message() {
        let h = harness();
        h.transport.reply(
            HttpMethod::Post,
            "/auth/login/",
            400,
            json!({"detail": "Invalid email or password"}),
        );
        let store = store(&h);

        let err = store
            .login(LoginCredentials::new("a@b.co", "wrong", false))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid email or password");
        let session = store.session();
        assert!(!session.is_authenticated);
        assert!(!session.has_access_token);
        assert_eq!(session.error.as_deref(), Some("Invalid email or password"));
        assert_eq!(session.status(), AuthStatus::Error);

        store.clear_error();
        assert_eq!(store.status(), AuthStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_invalid_form_never_hits_network() {
        let h = harness();
        let store = store(&h);

        let err = store
            .login(LoginCredentials::new("nope", "", false))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert!(store.session().error.unwrap().contains("email"));
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_everything_and_is_idempotent() {
        let h = harness();
        let store = signed_in(&h, true).await;
        h.transport.reply(HttpMethod::Post, "/auth/logout/", 200, json!({}));
        let mut rx = h.events.subscribe();

        store.logout().await;

        let session = store.session();
        assert!(session.user.is_none());
        assert!(!session.has_access_token);
        assert!(!session.has_refresh_token);
        assert!(!session.is_authenticated);
        assert!(h.durable.get(AUTH_SESSION_KEY).await.unwrap().is_none());
        assert!(h.session.get(AUTH_SESSION_KEY).await.unwrap().is_none());
        assert!(h.durable.get(AUTH_REMEMBER_KEY).await.unwrap().is_none());
        assert_eq!(h.transport.count(HttpMethod::Post, "/auth/logout/"), 1);
        let notify = h.transport.requests_to(HttpMethod::Post, "/auth/logout/");
        assert_eq!(notify[0].bearer.as_deref(), Some("acc-1"));

        assert_eq!(rx.try_recv().unwrap(), SessionEvent::LoggedOut);
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::LoginRequired {
                route: "/login".to_string()
            }
        );

        store.logout().await;
        assert_eq!(h.transport.count(HttpMethod::Post, "/auth/logout/"), 1);
        assert!(store.session().user.is_none());
        // remembered email is not session state
        assert_eq!(store.session().remembered_email.as_deref(), Some("a@b.co"));
    }

    #[tokio::test]
    async fn test_logout_ignores_notification_failure() {
        let h = harness();
        let store = signed_in(&h, false).await;
        h.transport.fail(HttpMethod::Post, "/auth/logout/");

        store.logout().await;

        assert!(!store.is_authenticated());
        assert!(store.session().error.is_none());
    }

    #[tokio::test]
    async fn test_logout_notification_401_does_not_refresh() {
        let h = harness();
        let store = signed_in(&h, false).await;
        h.transport.reply(HttpMethod::Post, "/auth/logout/", 401, json!({}));

        store.logout().await;

        assert_eq!(h.transport.count(HttpMethod::Post, TOKEN_REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_logs_out() {
        let h = harness();
        let store = store(&h);

        let err = store.refresh_access_token().await.unwrap_err();

        assert!(matches!(err, ApiError::SessionExpired));
        assert_eq!(
            store.session().error.as_deref(),
            Some(freelance_types::error::SESSION_EXPIRED_MESSAGE)
        );
        assert_eq!(h.transport.count(HttpMethod::Post, TOKEN_REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn test_refresh_success_and_failure() {
        let h = harness();
        let store = signed_in(&h, false).await;
        h.transport
            .reply(HttpMethod::Post, TOKEN_REFRESH_PATH, 200, json!({"access": "acc-2"}));

        store.refresh_access_token().await.unwrap();
        assert_eq!(store.access_token().unwrap().expose_secret(), "acc-2");
        assert!(store.is_authenticated());

        h.transport.reply(HttpMethod::Post, TOKEN_REFRESH_PATH, 401, json!({}));
        assert!(store.refresh_access_token().await.is_err());
        assert!(store.session().user.is_none());
        assert!(!store.session().has_refresh_token);
    }

    #[tokio::test]
    async fn test_update_user_merges_or_noops() {
        let h = harness();
        let anonymous = store(&h);
        anonymous
            .update_user(UserPatch {
                bio: Some("x".to_string()),
                ..Default::default()
            })
            .await;
        assert!(anonymous.user().is_none());

        let store = signed_in(&h, false).await;
        store
            .update_user(UserPatch {
                bio: Some("Rust contractor".to_string()),
                ..Default::default()
            })
            .await;
        let user = store.user().unwrap();
        assert_eq!(user.bio.as_deref(), Some("Rust contractor"));
        assert_eq!(user.username, "li_wei");

        let record = SessionRecord::load(&h.storage).await.unwrap().unwrap();
        assert_eq!(record.user.unwrap().bio.as_deref(), Some("Rust contractor"));
        assert!(record.is_authenticated);
    }

    #[tokio::test]
    async fn test_update_profile_replaces_user() {
        let h = harness();
        assert!(!store(&h).update_profile(UserPatch::default()).await.unwrap());

        let store = signed_in(&h, false).await;
        let mut updated = user_json();
        updated["first_name"] = json!("Vivian");
        h.transport.reply(HttpMethod::Patch, "/auth/profile/", 200, updated);

        let changed = store
            .update_profile(UserPatch {
                first_name: Some("Vivian".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(changed);
        assert_eq!(store.user().unwrap().first_name, "Vivian");
    }

    #[tokio::test]
    async fn test_expired_session_during_action_clears_user() {
        let h = harness();
        let store = signed_in(&h, false).await;
        h.transport.reply(HttpMethod::Patch, "/auth/profile/", 401, json!({}));
        h.transport.reply(HttpMethod::Post, TOKEN_REFRESH_PATH, 401, json!({}));

        let err = store.update_profile(UserPatch::default()).await.unwrap_err();

        assert!(matches!(err, ApiError::SessionExpired));
        let session = store.session();
        assert!(session.user.is_none());
        assert!(!session.is_authenticated);
        assert!(session.error.is_some());
    }

    #[tokio::test]
    async fn test_check_auth_status_outcomes() {
        let h = harness();
        let store = signed_in(&h, false).await;

        h.transport.reply(HttpMethod::Get, "/auth/me/", 200, user_json());
        assert!(store.check_auth_status().await.unwrap());

        h.transport.fail(HttpMethod::Get, "/auth/me/");
        assert!(store.check_auth_status().await.unwrap_err().is_network());
        assert!(store.is_authenticated());

        h.transport.reply(HttpMethod::Get, "/auth/me/", 403, json!({}));
        assert!(!store.check_auth_status().await.unwrap());
        assert!(!store.is_authenticated());
        assert!(store.user().is_none());

        assert!(!store.check_auth_status().await.unwrap());
    }

    #[tokio::test]
    async fn test_social_login_tracks_provider_flag() {
        let h = harness();
        let store = Arc::new(store(&h));
        h.transport.reply(HttpMethod::Post, "/auth/wechat/", 200, auth_json());
        let gate = h.transport.hold(HttpMethod::Post, "/auth/wechat/");

        let task = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .social_login(
                        SocialProvider::Wechat,
                        SocialAuthData {
                            code: "abc".to_string(),
                            state: None,
                            redirect_uri: None,
                        },
                    )
                    .await
            })
        };
        while !store.session().is_social_loading(SocialProvider::Wechat) {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.status(), AuthStatus::Authenticating);
        assert!(!store.session().is_social_loading(SocialProvider::Qq));
        assert!(!store.session().is_loading);

        gate.notify_one();
        let user = task.await.unwrap().unwrap();

        assert_eq!(user.id, 7);
        assert!(store.session().social_loading.is_empty());
        assert!(store.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_uses_session_scope() {
        let h = harness();
        h.transport.reply(HttpMethod::Post, "/auth/register/", 201, auth_json());
        let store = store(&h);

        let form = RegisterForm {
            data: RegisterData {
                username: "li_wei".to_string(),
                email: "a@b.co".to_string(),
                password: SecretString::from("longenough1".to_string()),
                first_name: "Wei".to_string(),
                last_name: "Li".to_string(),
                user_type: UserType::Freelancer,
                phone: None,
            },
            confirm_password: SecretString::from("longenough1".to_string()),
            agree_to_terms: true,
        };
        store.register(form).await.unwrap();

        assert!(store.is_authenticated());
        assert!(h.session.get(AUTH_SESSION_KEY).await.unwrap().is_some());
        assert!(h.durable.get(AUTH_SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_actions_validate_and_report() {
        let h = harness();
        let store = signed_in(&h, false).await;

        let err = store
            .change_password(PasswordChange {
                old_password: SecretString::from("x".to_string()),
                new_password: SecretString::from("short".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        h.transport.reply(
            HttpMethod::Post,
            "/auth/change-password/",
            400,
            json!({"old_password": ["wrong"], "detail": "Old password is incorrect"}),
        );
        let err = store
            .change_password(PasswordChange {
                old_password: SecretString::from("x".to_string()),
                new_password: SecretString::from("much-longer-pw".to_string()),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Old password is incorrect");
        assert_eq!(store.session().error.as_deref(), Some("Old password is incorrect"));

        h.transport.reply(HttpMethod::Post, "/auth/verify-email/", 200, json!({}));
        store.verify_email("tok").await.unwrap();
        assert!(store.user().unwrap().is_verified);
        assert!(store.session().error.is_none());
    }
}
