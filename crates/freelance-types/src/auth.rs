//! Credential and token payloads for the `/auth/*` endpoints.
//!
//! Passwords and tokens are held as `SecretString`. Types carrying them do not
//! derive `Serialize`; request bodies are built explicitly so the secret is
//! only exposed at the point it goes on the wire.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use std::fmt;
use std::str::FromStr;

use crate::user::{User, UserType};

/// Email/password login request.
pub struct LoginCredentials {
    pub email: String,
    pub password: SecretString,
    /// Persist the session to durable storage instead of the session scope.
    pub remember_me: bool,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>, remember_me: bool) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
            remember_me,
        }
    }

    /// JSON body for `POST /auth/login/`.
    pub fn to_body(&self) -> Value {
        json!({
            "email": self.email,
            "password": self.password.expose_secret(),
            "remember_me": self.remember_me,
        })
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

/// Account registration request.
pub struct RegisterData {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
    pub phone: Option<String>,
}

impl RegisterData {
    /// JSON body for `POST /auth/register/`.
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "username": self.username,
            "email": self.email,
            "password": self.password.expose_secret(),
            "first_name": self.first_name,
            "last_name": self.last_name,
            "user_type": self.user_type,
        });
        if let Some(phone) = &self.phone {
            body["phone"] = Value::String(phone.clone());
        }
        body
    }
}

impl fmt::Debug for RegisterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterData")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("user_type", &self.user_type)
            .finish_non_exhaustive()
    }
}

/// Third-party identity providers supported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Wechat,
    Qq,
    Alipay,
}

impl SocialProvider {
    pub const ALL: [SocialProvider; 3] = [SocialProvider::Wechat, SocialProvider::Qq, SocialProvider::Alipay];

    /// Endpoint path for the provider's code exchange.
    pub fn path(&self) -> String {
        format!("/auth/{self}/")
    }
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocialProvider::Wechat => write!(f, "wechat"),
            SocialProvider::Qq => write!(f, "qq"),
            SocialProvider::Alipay => write!(f, "alipay"),
        }
    }
}

impl FromStr for SocialProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wechat" => Ok(SocialProvider::Wechat),
            "qq" => Ok(SocialProvider::Qq),
            "alipay" => Ok(SocialProvider::Alipay),
            other => Err(format!("unsupported social provider: '{other}'")),
        }
    }
}

/// OAuth-style authorization code handed back by a social provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialAuthData {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

/// Successful login/register/social response: both tokens plus the user.
///
/// Intentionally does not derive Debug to avoid leaking tokens in logs.
#[derive(Deserialize)]
pub struct AuthResponse {
    #[serde(deserialize_with = "secret_string")]
    pub access: SecretString,
    #[serde(deserialize_with = "secret_string")]
    pub refresh: SecretString,
    pub user: User,
}

/// Response of `POST /auth/token/refresh/`. The refresh token is only present
/// when the backend rotates it.
#[derive(Deserialize)]
pub struct RefreshResponse {
    #[serde(deserialize_with = "secret_string")]
    pub access: SecretString,
    #[serde(default, deserialize_with = "optional_secret_string")]
    pub refresh: Option<SecretString>,
}

fn secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret_string<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// Body for `POST /auth/password-reset-confirm/`.
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: SecretString,
}

impl PasswordResetConfirm {
    pub fn to_body(&self) -> Value {
        json!({
            "token": self.token,
            "new_password": self.new_password.expose_secret(),
        })
    }
}

/// Body for `POST /auth/change-password/`.
pub struct PasswordChange {
    pub old_password: SecretString,
    pub new_password: SecretString,
}

impl PasswordChange {
    pub fn to_body(&self) -> Value {
        json!({
            "old_password": self.old_password.expose_secret(),
            "new_password": self.new_password.expose_secret(),
        })
    }
}

/// Client-side password strength grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordStrength::Weak => write!(f, "weak"),
            PasswordStrength::Medium => write!(f, "medium"),
            PasswordStrength::Strong => write!(f, "strong"),
        }
    }
}
