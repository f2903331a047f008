use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::core::config::Settings;
use crate::schemas::attempt::AttemptHistory;
use crate::schemas::exam::ExamDefinition;
use crate::schemas::submission::{SubmitRequest, SubmitResponse};
use crate::services::grading_client::{ClientError, GradingService, HttpGradingClient};
use crate::session::presented::PresentedExam;
use crate::session::ExamSession;

pub(crate) const SAMPLE_EXAM_ID: &str = "exam-1";

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

/// Three questions, one minute, retakes allowed unless `max_attempts` says otherwise.
pub(crate) fn sample_exam_json(duration_minutes: u32, max_attempts: Option<u32>) -> Value {
    json!({
        "_id": SAMPLE_EXAM_ID,
        "title": "Chemistry warm-up",
        "description": "Three quick questions.",
        "duration": duration_minutes,
        "negativeMarking": false,
        "allowRetake": true,
        "maxAttempts": max_attempts,
        "questions": [
            {"_id": "q1", "question": "Symbol for sodium?", "options": ["S", "Na", "So", "N"]},
            {"_id": "q2", "question": "pH of pure water?", "options": ["7", "0", "14"]},
            {"_id": "q3", "question": "Noble gas?", "options": [
                {"id": "o1", "text": "Oxygen"},
                {"id": "o2", "text": "Argon"}
            ]}
        ]
    })
}

pub(crate) fn sample_exam(duration_minutes: u32) -> ExamDefinition {
    serde_json::from_value(sample_exam_json(duration_minutes, None)).expect("sample exam")
}

pub(crate) fn sample_session(duration_minutes: u32) -> ExamSession {
    ExamSession::new(PresentedExam::in_definition_order(sample_exam(duration_minutes)))
}

pub(crate) fn client_for(base_url: &str) -> HttpGradingClient {
    HttpGradingClient::from_settings(&Settings::for_tests(base_url)).expect("client")
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StubOptions {
    pub(crate) max_attempts: Option<u32>,
    pub(crate) previous_attempts: u32,
    /// Number of submit calls answered with 502 before submissions are accepted.
    pub(crate) fail_submits: u32,
    pub(crate) fail_history: bool,
}

struct StubState {
    options: StubOptions,
    submit_failures_left: AtomicU32,
    submit_calls: AtomicUsize,
    history_calls: AtomicUsize,
    last_authorization: StdMutex<Option<String>>,
    last_submission: StdMutex<Option<SubmitRequest>>,
}

/// Grading service stand-in served over real HTTP on an ephemeral port.
pub(crate) struct StubGradingServer {
    addr: SocketAddr,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubGradingServer {
    pub(crate) async fn start(options: StubOptions) -> Self {
        let state = Arc::new(StubState {
            submit_failures_left: AtomicU32::new(options.fail_submits),
            options,
            submit_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
            last_authorization: StdMutex::new(None),
            last_submission: StdMutex::new(None),
        });

        let app = Router::new()
            .route("/api/exams/:exam_id", get(stub_exam))
            .route("/api/exams/:exam_id/submit", post(stub_submit))
            .route("/api/exams/:exam_id/my-attempts", get(stub_attempts))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server");
        });

        Self { addr, state, handle }
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub(crate) fn client(&self) -> HttpGradingClient {
        client_for(&self.base_url())
    }

    pub(crate) fn submit_count(&self) -> usize {
        self.state.submit_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn history_count(&self) -> usize {
        self.state.history_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().expect("stub lock").clone()
    }

    pub(crate) fn last_submission(&self) -> Option<SubmitRequest> {
        self.state.last_submission.lock().expect("stub lock").clone()
    }
}

impl Drop for StubGradingServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn remember_authorization(state: &StubState, headers: &HeaderMap) {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    *state.last_authorization.lock().expect("stub lock") = value;
}

async fn stub_exam(
    State(state): State<Arc<StubState>>,
    Path(exam_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    remember_authorization(&state, &headers);
    match exam_id.as_str() {
        SAMPLE_EXAM_ID => Json(sample_exam_json(1, state.options.max_attempts)).into_response(),
        "invalid" => {
            let mut exam = sample_exam_json(1, None);
            exam["questions"][0]["options"] = json!(["Only one"]);
            Json(exam).into_response()
        }
        "garbage" => (StatusCode::OK, "definitely not json").into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "Exam not found"}))).into_response(),
    }
}

async fn stub_submit(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(request): Json<SubmitRequest>,
) -> Response {
    remember_authorization(&state, &headers);
    let call = state.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
    *state.last_submission.lock().expect("stub lock") = Some(request);

    let fail = state
        .submit_failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok();
    if fail {
        return (StatusCode::BAD_GATEWAY, Json(json!({"detail": "Grading backend unavailable"})))
            .into_response();
    }

    Json(json!({
        "success": true,
        "attemptId": format!("attempt-{call}"),
        "score": 1,
        "maxScore": 3
    }))
    .into_response()
}

async fn stub_attempts(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    remember_authorization(&state, &headers);
    state.history_calls.fetch_add(1, Ordering::SeqCst);
    if state.options.fail_history {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"detail": "History unavailable"})))
            .into_response();
    }

    let attempts: Vec<Value> = (1..=state.options.previous_attempts)
        .map(|n| {
            json!({"id": format!("attempt-{n}"), "attemptNumber": n, "score": 2, "maxScore": 3})
        })
        .collect();
    Json(json!({
        "attempts": attempts,
        "stats": {
            "bestScore": 2,
            "averageScore": 2,
            "totalAttempts": state.options.previous_attempts
        }
    }))
    .into_response()
}

/// In-process grading service for tests that run on a paused clock.
pub(crate) struct FakeGradingService {
    submit_delay: Duration,
    submit_failures_left: AtomicU32,
    submissions: StdMutex<Vec<SubmitRequest>>,
}

impl FakeGradingService {
    pub(crate) fn new() -> Self {
        Self {
            submit_delay: Duration::ZERO,
            submit_failures_left: AtomicU32::new(0),
            submissions: StdMutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub(crate) fn failing_submits(self, count: u32) -> Self {
        self.submit_failures_left.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn submissions(&self) -> Vec<SubmitRequest> {
        self.submissions.lock().expect("fake lock").clone()
    }
}

#[async_trait]
impl GradingService for FakeGradingService {
    async fn fetch_exam(&self, _exam_id: &str) -> Result<ExamDefinition, ClientError> {
        Ok(sample_exam(1))
    }

    async fn submit(
        &self,
        _exam_id: &str,
        request: &SubmitRequest,
    ) -> Result<SubmitResponse, ClientError> {
        self.submissions.lock().expect("fake lock").push(request.clone());
        tokio::time::sleep(self.submit_delay).await;

        let fail = self
            .submit_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if fail {
            return Err(ClientError::Status { status: 502, detail: "unavailable".to_string() });
        }

        Ok(SubmitResponse {
            success: true,
            attempt_id: Some(format!("attempt-{}", self.submissions().len())),
            score: None,
            max_score: Some(3.0),
            message: None,
        })
    }

    async fn my_attempts(&self, _exam_id: &str) -> Result<AttemptHistory, ClientError> {
        Ok(AttemptHistory::default())
    }
}
