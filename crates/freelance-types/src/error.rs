use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Message used for every request that never produced a response.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network connection failed, please check your network settings";

/// Message returned when a session cannot be recovered by refreshing.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired, please log in again";

/// Errors surfaced by the API client, the auth session store and the listing
/// store.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No HTTP response was received (connection refused, DNS, timeout).
    #[error("{0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// A 401 could not be recovered by a token refresh.
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    SessionExpired,

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Build a status error, preferring the server's own message.
    pub fn from_status(status: u16, server_message: Option<String>) -> Self {
        let message = server_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| status_message(status).to_string());
        ApiError::Status { status, message }
    }

    pub fn network() -> Self {
        ApiError::Network(NETWORK_ERROR_MESSAGE.to_string())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::SessionExpired => Some(401),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

/// Fixed human-readable message for a status code without a server message.
pub fn status_message(status: u16) -> &'static str {
    match status {
        400 => "Bad request, please check your input",
        401 => "Not authorized, please log in",
        403 => "Access denied",
        404 => "The requested resource does not exist",
        405 => "Request method not allowed",
        408 => "Request timed out",
        409 => "Request conflicts with the current state",
        429 => "Too many requests, please try again later",
        500 => "Internal server error",
        502 => "Bad gateway",
        503 => "Service unavailable",
        504 => "Gateway timed out",
        500..=599 => "Server error, please try again later",
        _ => "Request failed",
    }
}

/// Errors from key-value persistence backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(String),

    #[error("stored value for '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("failed to serialize value for '{key}': {reason}")]
    Serialize { key: String, reason: String },
}

/// Failure reported by an HTTP transport before any response was read.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Other(String),
}

/// Errors raised while loading client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(String),

    #[error("invalid config file: {0}")]
    Parse(String),

    #[error("cannot determine data directory")]
    NoDataDir,
}

/// Client-side form validation failures, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when no field failed, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}
