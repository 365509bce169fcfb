//! Stub processing service
//!
//! A real axum server on an ephemeral local port, speaking the service's
//! routes: `GET /`, `POST /api/process`, `GET /api/status/:job_id` and
//! `GET /api/download/:file_id`. Every request is recorded for assertions.

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// File part captured from a submission
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// One `POST /api/process` as the service saw it
#[derive(Debug, Clone, Default)]
pub struct ReceivedSubmission {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, ReceivedFile>,
    pub job_id: Option<String>,
}

#[derive(Default)]
struct StubInner {
    submissions: Vec<ReceivedSubmission>,
    submit_status: Option<u16>,
    statuses: VecDeque<(u16, String)>,
    status_requests: Vec<String>,
    artifacts: HashMap<String, Vec<u8>>,
}

#[derive(Clone, Default)]
struct StubState(Arc<Mutex<StubInner>>);

pub struct StubServer {
    pub base_url: String,
    state: StubState,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start() -> Self {
        let state = StubState::default();
        let app = Router::new()
            .route("/", get(root))
            .route("/api/process", post(process))
            .route("/api/status/:job_id", get(job_status))
            .route("/api/download/:file_id", get(download))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    /// Answer submissions with this status code and a plain-text body
    pub fn fail_submissions(&self, status: u16) {
        self.state.0.lock().unwrap().submit_status = Some(status);
    }

    /// Queue a JSON status body
    pub fn push_status(&self, body: Value) {
        self.push_raw_status(200, body.to_string());
    }

    /// Queue an arbitrary status response
    pub fn push_raw_status(&self, status: u16, body: impl Into<String>) {
        self.state
            .0
            .lock()
            .unwrap()
            .statuses
            .push_back((status, body.into()));
    }

    pub fn add_artifact(&self, file_id: &str, bytes: &[u8]) {
        self.state
            .0
            .lock()
            .unwrap()
            .artifacts
            .insert(file_id.to_string(), bytes.to_vec());
    }

    pub fn submissions(&self) -> Vec<ReceivedSubmission> {
        self.state.0.lock().unwrap().submissions.clone()
    }

    pub fn status_requests(&self) -> Vec<String> {
        self.state.0.lock().unwrap().status_requests.clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "BGM Creator API is running" }))
}

async fn process(State(state): State<StubState>, mut multipart: Multipart) -> Response {
    let mut received = ReceivedSubmission::default();

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes: Bytes = field.bytes().await.unwrap();

        if file_name.is_some() {
            received.files.insert(
                name,
                ReceivedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                },
            );
        } else {
            received
                .fields
                .insert(name, String::from_utf8_lossy(&bytes).into_owned());
        }
    }

    let mut inner = state.0.lock().unwrap();
    if let Some(status) = inner.submit_status {
        inner.submissions.push(received);
        let status = StatusCode::from_u16(status).unwrap();
        return (status, "processing unavailable").into_response();
    }

    let job_id = uuid::Uuid::new_v4().to_string();
    received.job_id = Some(job_id.clone());
    inner.submissions.push(received);

    Json(json!({ "job_id": job_id, "message": "Processing started" })).into_response()
}

async fn job_status(State(state): State<StubState>, Path(job_id): Path<String>) -> Response {
    let mut inner = state.0.lock().unwrap();
    inner.status_requests.push(job_id);

    let (status, body) = inner
        .statuses
        .pop_front()
        .unwrap_or_else(|| (200, json!({ "status": "pending", "progress": 0 }).to_string()));

    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

async fn download(State(state): State<StubState>, Path(file_id): Path<String>) -> Response {
    let inner = state.0.lock().unwrap();
    match inner.artifacts.get(&file_id) {
        Some(bytes) => (
            [(header::CONTENT_TYPE, "video/mp4")],
            bytes.clone(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
