#![allow(dead_code)]

use aixmon_agent::write::{Client, Credentials, RemoteWriter};
use aixmon_common::proto::WriteRequest;
use aixmon_common::types::{Batch, Label, StoredMetric};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use prost::Message;
use reqwest::Url;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const USERNAME: &str = "agent";
pub const PASSWORD: &str = "secret";
/// base64("agent:secret")
pub const BASIC_AUTH: &str = "Basic YWdlbnQ6c2VjcmV0";

#[derive(Clone)]
pub struct MockResponse {
    pub status: StatusCode,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn status(code: u16) -> Self {
        Self {
            status: StatusCode::from_u16(code).expect("valid status"),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

pub struct RecordedRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn write_request(&self) -> WriteRequest {
        let raw = snap::raw::Decoder::new()
            .decompress_vec(&self.body)
            .expect("snappy body");
        WriteRequest::decode(raw.as_slice()).expect("protobuf body")
    }
}

#[derive(Default)]
pub struct MockState {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// In-process remote write endpoint answering with scripted responses.
///
/// Once the script runs out every request gets a 200.
pub struct MockRemote {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockRemote {
    pub async fn start(responses: Vec<MockResponse>) -> Self {
        let state = Arc::new(MockState {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/api/v1/write", post(record_write))
            .with_state(state.clone());
        let addr = serve(app).await;
        Self { addr, state }
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/api/v1/write", self.addr)).expect("mock url")
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().expect("requests lock").len()
    }

    pub fn take_requests(&self) -> Vec<RecordedRequest> {
        std::mem::take(&mut *self.state.requests.lock().expect("requests lock"))
    }

    pub fn client(&self, retry_on_rate_limit: bool) -> Client {
        Client::new(self.url(), Duration::from_secs(5), retry_on_rate_limit).expect("client")
    }

    pub fn writer(&self) -> RemoteWriter {
        self.writer_with(Duration::from_millis(50), Duration::from_millis(50))
    }

    pub fn writer_with(&self, send_interval: Duration, retry_wait: Duration) -> RemoteWriter {
        RemoteWriter::new(
            self.client(true),
            Credentials {
                username: USERNAME.to_string(),
                password: PASSWORD.to_string(),
            },
            send_interval,
            retry_wait,
        )
    }
}

async fn record_write(State(state): State<Arc<MockState>>, headers: HeaderMap, body: Bytes) -> Response {
    state
        .requests
        .lock()
        .expect("requests lock")
        .push(RecordedRequest { headers, body });

    let next = state
        .responses
        .lock()
        .expect("responses lock")
        .pop_front()
        .unwrap_or_else(|| MockResponse::status(200));

    let mut response = (next.status, next.body).into_response();
    for (name, value) in next.headers {
        response.headers_mut().insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(&value).expect("header value"),
        );
    }
    response
}

/// Serve a fixed exposition body at `/metrics`.
pub async fn start_exporter(body: &'static str) -> SocketAddr {
    let app = Router::new().route(
        "/metrics",
        get(move || async move { ([("content-type", "text/plain; version=0.0.4")], body) }),
    );
    serve(app).await
}

/// Serve an error status at `/metrics`.
pub async fn start_failing_exporter(status: StatusCode) -> SocketAddr {
    let app = Router::new().route("/metrics", get(move || async move { status }));
    serve(app).await
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr
}

pub fn batch(name: &str, timestamp_ms: i64, value: f64) -> Batch {
    vec![StoredMetric {
        labels: vec![
            Label::new("__name__", name),
            Label::new("job_name", "aix_exporter"),
        ],
        timestamp_ms,
        value,
    }]
}
