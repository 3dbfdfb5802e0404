//! `/auth/*` endpoints.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use freelance_types::auth::{
    AuthResponse, LoginCredentials, PasswordChange, PasswordResetConfirm, RegisterData,
    SocialAuthData, SocialProvider,
};
use freelance_types::error::ApiError;
use freelance_types::user::{User, UserPatch};

use crate::http::{ApiClient, HttpRequest, HttpTransport, RequestDescriptor};

pub struct AuthApi<T: HttpTransport> {
    client: Arc<ApiClient<T>>,
}

impl<T: HttpTransport> AuthApi<T> {
    pub fn new(client: Arc<ApiClient<T>>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient<T>> {
        &self.client
    }

    /// Credential exchanges report their own 401 instead of refreshing.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, ApiError> {
        let request = HttpRequest::post("/auth/login/").with_json(credentials.to_body());
        self.client.send_json(RequestDescriptor::anonymous(request)).await
    }

    pub async fn register(&self, data: &RegisterData) -> Result<AuthResponse, ApiError> {
        let request = HttpRequest::post("/auth/register/").with_json(data.to_body());
        self.client.send_json(RequestDescriptor::anonymous(request)).await
    }

    pub async fn social_login(
        &self,
        provider: SocialProvider,
        data: &SocialAuthData,
    ) -> Result<AuthResponse, ApiError> {
        let body = serde_json::to_value(data).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let request = HttpRequest::post(provider.path()).with_json(body);
        self.client.send_json(RequestDescriptor::anonymous(request)).await
    }

    /// Server-side logout notification. Never triggers a refresh.
    pub async fn logout(&self, refresh: Option<&SecretString>) -> Result<(), ApiError> {
        let mut request = HttpRequest::post("/auth/logout/");
        if let Some(refresh) = refresh {
            request = request.with_json(json!({ "refresh": refresh.expose_secret() }));
        }
        self.client.send_empty(RequestDescriptor::anonymous(request)).await
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        self.client.send_json(HttpRequest::get("/auth/me/")).await
    }

    pub async fn update_profile(&self, patch: &UserPatch) -> Result<User, ApiError> {
        let body = serde_json::to_value(patch).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.client
            .send_json(HttpRequest::patch("/auth/profile/").with_json(body))
            .await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        let request = HttpRequest::post("/auth/password-reset/").with_json(json!({ "email": email }));
        self.client.send_empty(RequestDescriptor::anonymous(request)).await
    }

    pub async fn confirm_password_reset(&self, confirm: &PasswordResetConfirm) -> Result<(), ApiError> {
        let request = HttpRequest::post("/auth/password-reset-confirm/").with_json(confirm.to_body());
        self.client.send_empty(RequestDescriptor::anonymous(request)).await
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        self.client
            .send_empty(HttpRequest::post("/auth/change-password/").with_json(change.to_body()))
            .await
    }

    pub async fn verify_email(&self, token: &str) -> Result<(), ApiError> {
        let request = HttpRequest::post("/auth/verify-email/").with_json(json!({ "token": token }));
        self.client.send_empty(RequestDescriptor::anonymous(request)).await
    }

    pub async fn resend_verification(&self, email: &str) -> Result<(), ApiError> {
        let request =
            HttpRequest::post("/auth/resend-verification/").with_json(json!({ "email": email }));
        self.client.send_empty(RequestDescriptor::anonymous(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::testing::harness;

    #[tokio::test]
    async fn test_social_login_posts_to_provider_path() {
        let h = harness();
        let api = AuthApi::new(Arc::clone(&h.client));
        h.transport.reply(
            HttpMethod::Post,
            "/auth/qq/",
            200,
            json!({"access": "a", "refresh": "r", "user": {"id": 1, "username": "u", "email": "u@x.io"}}),
        );

        let resp = api
            .social_login(
                SocialProvider::Qq,
                &SocialAuthData {
                    code: "c0de".to_string(),
                    state: None,
                    redirect_uri: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(resp.user.id, 1);
        let sent = h.transport.last().unwrap();
        assert_eq!(sent.body.unwrap(), json!({"code": "c0de"}));
    }

    #[tokio::test]
    async fn test_update_profile_sends_only_present_fields() {
        let h = harness();
        let api = AuthApi::new(Arc::clone(&h.client));
        h.transport.reply(
            HttpMethod::Patch,
            "/auth/profile/",
            200,
            json!({"id": 1, "username": "u", "email": "u@x.io", "bio": "new"}),
        );

        let user = api
            .update_profile(&UserPatch {
                bio: Some("new".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(user.bio.as_deref(), Some("new"));
        assert_eq!(h.transport.last().unwrap().body.unwrap(), json!({"bio": "new"}));
    }

    #[tokio::test]
    async fn test_password_reset_confirm_body() {
        let h = harness();
        let api = AuthApi::new(Arc::clone(&h.client));
        h.transport.reply(HttpMethod::Post, "/auth/password-reset-confirm/", 200, json!({}));

        api.confirm_password_reset(&PasswordResetConfirm {
            token: "t".to_string(),
            new_password: SecretString::from("n3w-password".to_string()),
        })
        .await
        .unwrap();

        let body = h.transport.last().unwrap().body.unwrap();
        assert_eq!(body["new_password"], "n3w-password");
        assert_eq!(body["token"], "t");
    }
}
