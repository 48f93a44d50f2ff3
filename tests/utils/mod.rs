// Integration test utilities
//
// Loopback axum stub standing in for the GitHub REST and GraphQL endpoints,
// plus observation-table fixtures for the analyzer.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::oneshot;

/// One request as the stub saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Canned response per (method, path-with-query); anything else is a 404
#[derive(Debug, Clone, Default)]
pub struct Routes {
    routes: HashMap<(String, String), (u16, String)>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(mut self, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .insert(("GET".into(), path.into()), (status, body.into()));
        self
    }

    pub fn post(mut self, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .insert(("POST".into(), path.into()), (status, body.into()));
        self
    }

    /// The GitHub paths used by the default catalog, with distinct body sizes
    pub fn github() -> Self {
        Self::new()
            .get("/users/gaearon", 200, &json_body(300))
            .get(
                "/repos/facebook/react/issues?per_page=5&state=open",
                200,
                &json_body(4_000),
            )
            .get("/repos/facebook/react", 200, &json_body(6_000))
            .get("/repos/facebook/react/pulls?per_page=3", 200, &json_body(20_000))
            .get("/repos/facebook/react/commits?per_page=3", 200, &json_body(9_000))
            .post("/graphql", 200, &json_body(700))
    }
}

/// A JSON document of exactly `len` bytes
pub fn json_body(len: usize) -> String {
    let overhead = r#"{"data":""}"#.len();
    format!(r#"{{"data":"{}"}}"#, "x".repeat(len.saturating_sub(overhead)))
}

#[derive(Clone)]
struct StubState {
    routes: Arc<Routes>,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Records every request, then answers from the route table
async fn respond(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());
    let (status, reply) = state
        .routes
        .routes
        .get(&(method.to_string(), path.clone()))
        .cloned()
        .unwrap_or((404, r#"{"message":"Not Found"}"#.to_string()));

    state.log.lock().expect("request log").push(RecordedRequest {
        method: method.to_string(),
        path,
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let status = StatusCode::from_u16(status).expect("valid status");
    (status, [(header::CONTENT_TYPE, "application/json")], reply).into_response()
}

/// axum server on an ephemeral loopback port, stopped on drop
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubServer {
    pub fn start(routes: Routes) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        listener.set_nonblocking(true).expect("nonblocking listener");
        let base_url = format!("http://{}", listener.local_addr().expect("local addr"));

        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(respond).with_state(StubState {
            routes: Arc::new(routes),
            log: Arc::clone(&requests),
        });

        let (shutdown, stopped) = oneshot::channel::<()>();
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("tokio runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = stopped.await;
                    })
                    .await
                    .expect("stub server");
            });
        });

        Self {
            base_url,
            requests,
            shutdown: Some(shutdown),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("request log").clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub const OBSERVATIONS_HEADER: &str =
    "query_type,api_type,response_time_ms,payload_size_bytes,trial,timestamp";

/// Raw table for `trials` paired trials
///
/// Times are evenly spread (normal per Shapiro-Wilk); GraphQL is 50 ms
/// slower. Payloads vary by one byte per trial unless `constant_payloads`.
pub fn observations_csv(trials: u32, constant_payloads: bool) -> String {
    let mut csv = String::from(OBSERVATIONS_HEADER);
    csv.push('\n');
    for trial in 1..=trials {
        // 0, 2, 4, 1, 3 ... : a permutation of an evenly spaced grid
        let offset = f64::from((trial * 2) % trials.max(1)) + f64::from(trial % 2) * 0.5;
        let jitter = if constant_payloads { 0 } else { u64::from(trial % 5) };
        for (query, base_ms, rest_bytes, graphql_bytes) in [
            ("simple", 100.0, 1_300, 400),
            ("medium", 180.0, 24_000, 1_100),
            ("complex", 420.0, 38_000, 1_900),
        ] {
            csv.push_str(&format!(
                "{},REST,{},{},{},2025-03-01T10:00:{:02}.000000\n",
                query,
                base_ms + offset,
                rest_bytes + jitter,
                trial,
                trial % 60
            ));
            csv.push_str(&format!(
                "{},GraphQL,{},{},{},2025-03-01T10:00:{:02}.500000\n",
                query,
                base_ms + 50.0 + offset * 1.1,
                graphql_bytes + jitter * 2,
                trial,
                trial % 60
            ));
        }
    }
    csv
}
