//! ReqwestTransport -- concrete [`HttpTransport`] over `reqwest`.
//!
//! Joins relative paths onto the configured base URL, attaches the bearer
//! token, sends JSON or multipart bodies and reads the full response. Every
//! HTTP status is returned as a response; only a failure to get one is an
//! error.
//!
//! Multipart file parts are streamed in chunks so upload progress can be
//! reported as bytes leave the client.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};

use freelance_core::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, ProgressFn, RequestBody, UploadPart,
};
use freelance_types::error::TransportError;

/// Size of each streamed multipart chunk.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// HTTP transport for the marketplace backend.
///
/// Holds no credentials; the bearer token is handed in per request by
/// `ApiClient`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Create a transport with an overall per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL for a relative API path.
    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        bearer: Option<&SecretString>,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.url(&request.path);
        let mut builder = self
            .client
            .request(Self::method(request.method), &url)
            .header(reqwest::header::ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => {
                builder.multipart(multipart_form(parts, request.on_progress.clone())?)
            }
        };

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_send_error)?;

        if matches!(request.body, RequestBody::Multipart(_)) {
            request.report_progress(1.0);
        }
        tracing::trace!(%url, status, bytes = body.len(), "response received");
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

fn map_send_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

/// Build the multipart form. With a progress callback, file parts are
/// streamed and progress is the fraction of all file bytes handed to the
/// connection so far.
fn multipart_form(parts: &[UploadPart], on_progress: Option<ProgressFn>) -> Result<Form, TransportError> {
    let total: u64 = parts
        .iter()
        .filter(|p| matches!(p, UploadPart::File { .. }))
        .map(|p| p.len() as u64)
        .sum();
    let sent = Arc::new(AtomicU64::new(0));

    let mut form = Form::new();
    for part in parts {
        form = match part {
            UploadPart::Text { name, value } => form.text(name.clone(), value.clone()),
            UploadPart::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                let body = match &on_progress {
                    Some(cb) => Part::stream_with_length(
                        progress_body(bytes.clone(), Arc::clone(&sent), total, Arc::clone(cb)),
                        bytes.len() as u64,
                    ),
                    None => Part::bytes(bytes.clone()),
                };
                let mut file_part = body.file_name(file_name.clone());
                if let Some(mime) = content_type {
                    file_part = file_part
                        .mime_str(mime)
                        .map_err(|e| TransportError::Other(format!("invalid content type '{mime}': {e}")))?;
                }
                form.part(name.clone(), file_part)
            }
        };
    }
    Ok(form)
}

fn progress_body(bytes: Vec<u8>, sent: Arc<AtomicU64>, total: u64, cb: ProgressFn) -> reqwest::Body {
    let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK_BYTES).map(<[u8]>::to_vec).collect();
    let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
        let done = sent.fetch_add(chunk.len() as u64, Ordering::AcqRel) + chunk.len() as u64;
        if total > 0 {
            cb((done as f64 / total as f64).min(1.0) as f32);
        }
        Ok::<_, std::io::Error>(chunk)
    }));
    reqwest::Body::wrap_stream(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP server: captures the raw request and answers with
    /// `status` and a JSON body.
    async fn serve_once(status: u16, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let raw = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            raw
        });
        (format!("http://{addr}/api/"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn transport(base: &str) -> ReqwestTransport {
        ReqwestTransport::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_joins_paths_onto_base_url() {
        let t = transport("http://localhost:8000/api/");
        assert_eq!(t.base_url(), "http://localhost:8000/api");
        assert_eq!(t.url("/services/3/"), "http://localhost:8000/api/services/3/");
        assert_eq!(t.url("categories/"), "http://localhost:8000/api/categories/");
    }

    #[tokio::test]
    async fn test_sends_bearer_query_and_json() {
        let (base, server) = serve_once(200, r#"{"ok":true}"#).await;
        let t = transport(&base);
        let token = SecretString::from("tok-123".to_string());
        let request = HttpRequest::post("/orders/5/cancel/")
            .with_query(vec![("page".to_string(), "2".to_string())])
            .with_json(serde_json::json!({"reason": "late"}));

        let response = t.send(&request, Some(&token)).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.json::<serde_json::Value>().unwrap()["ok"], true);
        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/orders/5/cancel/?page=2 HTTP/1.1"));
        assert!(raw.to_lowercase().contains("authorization: bearer tok-123"));
        assert!(raw.contains(r#"{"reason":"late"}"#));
    }

    #[tokio::test]
    async fn test_error_statuses_are_responses() {
        let (base, server) = serve_once(404, r#"{"detail":"Not found."}"#).await;
        let response = transport(&base)
            .send(&HttpRequest::get("/services/9/"), None)
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.server_message().as_deref(), Some("Not found."));
        let raw = server.await.unwrap();
        assert!(!raw.to_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_multipart_reports_progress_to_completion() {
        let (base, server) = serve_once(201, r#"{"images":["a.png"]}"#).await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let cb: ProgressFn = {
            let seen = Arc::clone(&seen);
            Arc::new(move |f: f32| seen.lock().unwrap().push(f))
        };
        let request = HttpRequest::post("/services/1/upload-images/")
            .with_multipart(vec![UploadPart::file("images", "a.png", vec![7u8; 200_000])])
            .with_progress(cb);

        let response = transport(&base).send(&request, None).await.unwrap();

        assert_eq!(response.status, 201);
        let seen = seen.lock().unwrap().clone();
        assert!(seen.len() >= 2);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
        let raw = server.await.unwrap();
        assert!(raw.contains("multipart/form-data"));
        assert!(raw.contains("filename=\"a.png\""));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = transport(&format!("http://{addr}"))
            .send(&HttpRequest::get("/auth/me/"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Connect(_)));
    }
}
