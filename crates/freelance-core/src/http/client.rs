//! API client: bearer injection, status mapping and one-shot
//! refresh-and-retry on 401.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use freelance_types::auth::RefreshResponse;
use freelance_types::error::ApiError;
use freelance_types::event::SessionEvent;

use super::request::{HttpRequest, HttpResponse, RequestDescriptor};
use super::transport::HttpTransport;
use crate::auth::tokens::TokenVault;
use crate::event::SessionEventBus;

pub const TOKEN_REFRESH_PATH: &str = "/auth/token/refresh/";

/// Wraps a transport with the session rules every authenticated call shares.
///
/// A 401 on a fresh request triggers exactly one token refresh, sent straight
/// through the transport, and one replay. A second 401, a missing refresh
/// token or a failed refresh clears the tokens, publishes `LoginRequired`
/// and yields `ApiError::SessionExpired`.
pub struct ApiClient<T: HttpTransport> {
    transport: T,
    tokens: Arc<TokenVault>,
    events: SessionEventBus,
    login_route: String,
    /// Serializes refreshes so concurrent 401s share one exchange.
    refresh_lock: Mutex<()>,
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(
        transport: T,
        tokens: Arc<TokenVault>,
        events: SessionEventBus,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            tokens,
            events,
            login_route: login_route.into(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenVault> {
        &self.tokens
    }

    pub fn events(&self) -> &SessionEventBus {
        &self.events
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Send a request, applying refresh-and-retry at most once.
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<HttpResponse, ApiError> {
        let mut descriptor = descriptor;
        loop {
            let generation = self.tokens.generation();
            let bearer = self.tokens.access();
            debug!(
                request_id = %descriptor.request_id,
                method = %descriptor.request.method,
                path = %descriptor.request.path,
                retried = descriptor.has_retried,
                "dispatching request"
            );

            let response = self
                .transport
                .send(&descriptor.request, bearer.as_ref())
                .await
                .map_err(|e| {
                    warn!(request_id = %descriptor.request_id, error = %e, "request failed without response");
                    ApiError::network()
                })?;

            if response.is_success() {
                return Ok(response);
            }

            if response.status != 401 || !descriptor.recover_auth {
                return Err(ApiError::from_status(
                    response.status,
                    response.server_message(),
                ));
            }

            if descriptor.has_retried {
                warn!(request_id = %descriptor.request_id, "replayed request rejected, forcing logout");
                self.force_logout().await;
                return Err(ApiError::SessionExpired);
            }

            if let Err(e) = self.refresh_after(generation).await {
                warn!(request_id = %descriptor.request_id, error = %e, "token refresh failed, forcing logout");
                self.force_logout().await;
                return Err(ApiError::SessionExpired);
            }
            descriptor.has_retried = true;
        }
    }

    /// Refresh unless another caller already replaced the tokens since the
    /// failing request was sent.
    async fn refresh_after(&self, generation: u64) -> Result<(), ApiError> {
        let _guard = self.refresh_lock.lock().await;
        if self.tokens.generation() != generation && self.tokens.has_access() {
            debug!("tokens changed while waiting, skipping refresh");
            return Ok(());
        }
        self.exchange_refresh_token().await
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Goes straight to the transport so a 401 here can never recurse into
    /// another refresh. Does not clear the session on failure; callers decide.
    pub async fn exchange_refresh_token(&self) -> Result<(), ApiError> {
        let Some(refresh) = self.tokens.refresh() else {
            return Err(ApiError::SessionExpired);
        };
        let request = HttpRequest::post(TOKEN_REFRESH_PATH)
            .with_json(json!({ "refresh": refresh.expose_secret() }));

        let response = self
            .transport
            .send(&request, None)
            .await
            .map_err(|_| ApiError::network())?;
        if !response.is_success() {
            return Err(ApiError::from_status(
                response.status,
                response.server_message(),
            ));
        }

        let body: RefreshResponse = response.json()?;
        self.tokens.replace_access(body.access, body.refresh).await;
        self.events.publish(SessionEvent::TokenRefreshed);
        info!("access token refreshed");
        Ok(())
    }

    /// Clear tokens and ask the front end to navigate to the login route.
    pub async fn force_logout(&self) {
        self.tokens.clear().await;
        self.events.login_required(&self.login_route);
    }

    /// Execute and decode a JSON response.
    pub async fn send_json<R: DeserializeOwned>(
        &self,
        descriptor: impl Into<RequestDescriptor>,
    ) -> Result<R, ApiError> {
        self.execute(descriptor.into()).await?.json()
    }

    /// Execute and discard the response body.
    pub async fn send_empty(&self, descriptor: impl Into<RequestDescriptor>) -> Result<(), ApiError> {
        self.execute(descriptor.into()).await.map(|_| ())
    }
}

impl<T: HttpTransport> std::fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("tokens", &self.tokens)
            .field("login_route", &self.login_route)
            .finish_non_exhaustive()
    }
}
