//! # Week Resolver Stub Server
//!
//! A scripted stand-in for the week resolver service, used by the
//! integration tests under `tests/`.
//!
//! The stub answers every GET with the next reply of its script; once the
//! script is used up the last reply repeats. Each request is counted and its
//! path recorded, so tests can assert on the number of physical attempts.

#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Body of the recorded `DPF` lookup for 2019-10-10.
pub const DPF_201943_BODY: &str = r#"{"catalogueCode":"DPF","year":2019,"weekNumber":43,"weekCode":"DPF201943","date":"2019-10-21"}"#;

/// One scripted answer.
#[derive(Debug, Clone)]
pub struct StubReply {
    /// Status code to answer with.
    pub status: u16,
    /// Raw response body.
    pub body: String,
    /// Pause before answering.
    pub delay: Option<Duration>,
}

impl StubReply {
    /// A reply with the given status and an empty body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            delay: None,
        }
    }

    /// A 200 reply carrying `body`.
    pub fn ok(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay: None,
        }
    }

    /// Same reply, sent after `delay`.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug)]
struct StubState {
    script: Vec<StubReply>,
    hits: AtomicUsize,
    paths: Mutex<Vec<String>>,
}

/// A running stub bound to a random local port.
#[derive(Debug)]
pub struct StubServer {
    base_url: String,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Starts a stub that plays `script` in order.
    pub async fn start(script: Vec<StubReply>) -> Self {
        assert!(!script.is_empty(), "stub script must not be empty");
        let state = Arc::new(StubState {
            script,
            hits: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(reply).with_state(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub address");
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("stub server stopped: {}", e);
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    /// Starts a stub that always gives the same reply.
    pub async fn always(reply: StubReply) -> Self {
        Self::start(vec![reply]).await
    }

    /// Root URL of the stub, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of requests received so far.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// Paths of the requests received so far, in arrival order.
    pub fn paths(&self) -> Vec<String> {
        self.state.paths.lock().expect("paths lock").clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn reply(State(state): State<Arc<StubState>>, uri: Uri) -> Response {
    state
        .paths
        .lock()
        .expect("paths lock")
        .push(uri.path().to_string());
    let index = state.hits.fetch_add(1, Ordering::SeqCst);
    let scripted = state
        .script
        .get(index)
        .or_else(|| state.script.last())
        .cloned()
        .expect("non-empty script");

    if let Some(delay) = scripted.delay {
        tokio::time::sleep(delay).await;
    }

    let status = StatusCode::from_u16(scripted.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        scripted.body,
    )
        .into_response()
}

/// Returns a local address nothing listens on.
pub async fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{}", addr)
}
