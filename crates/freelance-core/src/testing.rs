//! Test doubles shared by the core unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::Notify;

use freelance_types::error::TransportError;

use crate::auth::TokenVault;
use crate::event::SessionEventBus;
use crate::http::{ApiClient, HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestBody, UploadPart};
use crate::storage::{BoxKvStore, MemoryKvStore, StorageSelector};

#[derive(Debug, Clone)]
enum MockReply {
    Respond(u16, Value),
    Down,
}

/// What the mock saw for one call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<Value>,
    pub upload_fields: Vec<String>,
}

impl RecordedRequest {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type Route = (HttpMethod, String);

#[derive(Default)]
struct MockInner {
    replies: Mutex<HashMap<Route, VecDeque<MockReply>>>,
    gates: Mutex<HashMap<Route, Arc<Notify>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Scripted transport. Each route answers from a queue; the last reply
/// sticks. Unscripted routes answer 404.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
        self.script(method, path, vec![MockReply::Respond(status, body)]);
    }

    pub fn reply_sequence(&self, method: HttpMethod, path: &str, replies: Vec<(u16, Value)>) {
        let replies = replies
            .into_iter()
            .map(|(status, body)| MockReply::Respond(status, body))
            .collect();
        self.script(method, path, replies);
    }

    /// Simulate a dropped connection on the route.
    pub fn fail(&self, method: HttpMethod, path: &str) {
        self.script(method, path, vec![MockReply::Down]);
    }

    /// Hold calls on the route until the returned gate is notified.
    pub fn hold(&self, method: HttpMethod, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner
            .gates
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Arc::clone(&gate));
        gate
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    pub fn last(&self) -> Option<RecordedRequest> {
        self.requests().pop()
    }

    fn script(&self, method: HttpMethod, path: &str, replies: Vec<MockReply>) {
        self.inner
            .replies
            .lock()
            .unwrap()
            .insert((method, path.to_string()), replies.into());
    }

    fn next_reply(&self, route: &Route) -> MockReply {
        let mut replies = self.inner.replies.lock().unwrap();
        match replies.get_mut(route) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(MockReply::Respond(404, Value::Null)),
            None => MockReply::Respond(404, Value::Null),
        }
    }
}

impl HttpTransport for MockTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        bearer: Option<&SecretString>,
    ) -> Result<HttpResponse, TransportError> {
        let route = (request.method, request.path.clone());
        let (body, upload_fields) = match &request.body {
            RequestBody::Empty => (None, Vec::new()),
            RequestBody::Json(value) => (Some(value.clone()), Vec::new()),
            RequestBody::Multipart(parts) => (
                None,
                parts
                    .iter()
                    .map(|p| match p {
                        UploadPart::Text { name, .. } | UploadPart::File { name, .. } => name.clone(),
                    })
                    .collect(),
            ),
        };
        self.inner.requests.lock().unwrap().push(RecordedRequest {
            method: request.method,
            path: request.path.clone(),
            query: request.query.clone(),
            bearer: bearer.map(|b| b.expose_secret().to_string()),
            body,
            upload_fields,
        });

        let gate = self.inner.gates.lock().unwrap().get(&route).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if matches!(request.body, RequestBody::Multipart(_)) {
            request.report_progress(0.5);
            request.report_progress(1.0);
        }

        match self.next_reply(&route) {
            MockReply::Respond(status, body) => Ok(HttpResponse::new(status, body.to_string())),
            MockReply::Down => Err(TransportError::Connect("connection refused".to_string())),
        }
    }
}

/// Everything a store test needs, wired the way the CLI wires it.
pub struct Harness {
    pub transport: MockTransport,
    pub client: Arc<ApiClient<MockTransport>>,
    pub vault: Arc<TokenVault>,
    pub events: SessionEventBus,
    pub storage: StorageSelector,
    pub durable: MemoryKvStore,
    pub session: MemoryKvStore,
}

impl Harness {
    /// A second client/vault pair over the same storage, as after a restart
    /// that kept durable storage and (in-process) the session scope.
    pub fn reopen(&self) -> Harness {
        build(self.durable.clone(), self.session.clone())
    }

    /// Like `reopen`, but the session scope is lost (process restart).
    pub fn restart(&self) -> Harness {
        build(self.durable.clone(), MemoryKvStore::new())
    }
}

pub fn harness() -> Harness {
    build(MemoryKvStore::new(), MemoryKvStore::new())
}

fn build(durable: MemoryKvStore, session: MemoryKvStore) -> Harness {
    let storage = StorageSelector::new(BoxKvStore::new(durable.clone()), BoxKvStore::new(session.clone()));
    let vault = Arc::new(TokenVault::new(storage.clone()));
    let events = SessionEventBus::default();
    let transport = MockTransport::new();
    let client = Arc::new(ApiClient::new(
        transport.clone(),
        Arc::clone(&vault),
        events.clone(),
        "/login",
    ));
    Harness {
        transport,
        client,
        vault,
        events,
        storage,
        durable,
        session,
    }
}
