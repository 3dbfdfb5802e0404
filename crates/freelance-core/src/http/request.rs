//! Transport-agnostic request and response types.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use freelance_types::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Patch => write!(f, "PATCH"),
            HttpMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// Upload progress callback, called with the fraction sent (0.0..=1.0).
pub type ProgressFn = Arc<dyn Fn(f32) + Send + Sync>;

/// One field of a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

impl UploadPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        UploadPart::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn file(name: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        UploadPart::File {
            name: name.into(),
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    /// Payload size in bytes, used for progress accounting.
    pub fn len(&self) -> usize {
        match self {
            UploadPart::Text { value, .. } => value.len(),
            UploadPart::File { bytes, .. } => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<UploadPart>),
}

/// A request relative to the configured API base URL.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Path relative to the base URL, e.g. `/services/42/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub on_progress: Option<ProgressFn>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            on_progress: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn with_multipart(mut self, parts: Vec<UploadPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Report upload progress, clamped to 0.0..=1.0.
    pub fn report_progress(&self, fraction: f32) {
        if let Some(cb) = &self.on_progress {
            cb(fraction.clamp(0.0, 1.0));
        }
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// A request plus the bookkeeping the API client needs to replay it.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub request: HttpRequest,
    /// Set once the request has been replayed after a token refresh.
    pub has_retried: bool,
    /// Whether a 401 should trigger refresh-and-retry. Disabled for
    /// credential exchanges and the best-effort logout notification.
    pub recover_auth: bool,
    /// Correlates log lines for one logical request across a replay.
    pub request_id: Uuid,
}

impl RequestDescriptor {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            has_retried: false,
            recover_auth: true,
            request_id: Uuid::now_v7(),
        }
    }

    /// A request whose 401 is reported as-is instead of refreshing.
    pub fn anonymous(request: HttpRequest) -> Self {
        Self {
            recover_auth: false,
            ..Self::new(request)
        }
    }
}

impl From<HttpRequest> for RequestDescriptor {
    fn from(request: HttpRequest) -> Self {
        Self::new(request)
    }
}

/// Raw response: status plus body bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Human-readable message supplied by the server, if any.
    ///
    /// Checks `detail`, `message`, `error`, then the first entry of
    /// `non_field_errors`.
    pub fn server_message(&self) -> Option<String> {
        let value: Value = serde_json::from_slice(&self.body).ok()?;
        for key in ["detail", "message", "error"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return Some(text.to_string());
            }
        }
        value
            .get("non_field_errors")
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}
