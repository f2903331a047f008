use std::time::Instant;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::core::config::Settings;
use crate::schemas::attempt::AttemptHistory;
use crate::schemas::exam::ExamDefinition;
use crate::schemas::submission::{SubmitRequest, SubmitResponse};

const MAX_DETAIL_CHARS: usize = 300;

#[derive(Debug, Error)]
pub(crate) enum ClientError {
    #[error("grading service unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("grading service responded with {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("unexpected response from grading service: {0}")]
    Decode(String),
}

impl ClientError {
    pub(crate) fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

/// The remote side of an exam session. None of these calls are retried here.
#[async_trait]
pub(crate) trait GradingService: Send + Sync {
    async fn fetch_exam(&self, exam_id: &str) -> Result<ExamDefinition, ClientError>;

    async fn submit(
        &self,
        exam_id: &str,
        request: &SubmitRequest,
    ) -> Result<SubmitResponse, ClientError>;

    async fn my_attempts(&self, exam_id: &str) -> Result<AttemptHistory, ClientError>;
}

#[derive(Debug, Clone)]
pub(crate) struct HttpGradingClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpGradingClient {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api = settings.api();
        let client = Client::builder()
            .connect_timeout(api.connect_timeout())
            .timeout(api.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = Url::parse(api.base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid grading service URL {}", api.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Grading service URL {} cannot carry a path", api.base_url);
        }

        Ok(Self {
            client,
            base_url,
            token: api.token.clone(),
        })
    }

    /// `exam_id` is pushed as one percent-encoded path segment.
    fn url(&self, exam_id: &str, action: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("exams").push(exam_id);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        exam_id: &str,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let timer = Instant::now();
        let response = self.authorize(request).send().await.map_err(|err| {
            tracing::warn!(
                exam_id,
                endpoint,
                elapsed_ms = timer.elapsed().as_millis() as u64,
                error = %err,
                "Grading service request failed"
            );
            ClientError::Transport(err)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(ClientError::Transport)?;
        let elapsed_ms = timer.elapsed().as_millis() as u64;

        if !status.is_success() {
            tracing::warn!(
                exam_id,
                endpoint,
                status = status.as_u16(),
                elapsed_ms,
                "Grading service returned an error status"
            );
            return Err(ClientError::Status {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        tracing::info!(
            exam_id,
            endpoint,
            status = status.as_u16(),
            elapsed_ms,
            "Grading service call"
        );
        serde_json::from_str(&body).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

#[async_trait]
impl GradingService for HttpGradingClient {
    async fn fetch_exam(&self, exam_id: &str) -> Result<ExamDefinition, ClientError> {
        let request = self.client.get(self.url(exam_id, None));
        self.send_json("fetch_exam", exam_id, request).await
    }

    async fn submit(
        &self,
        exam_id: &str,
        request: &SubmitRequest,
    ) -> Result<SubmitResponse, ClientError> {
        let builder = self.client.post(self.url(exam_id, Some("submit"))).json(request);
        self.send_json("submit", exam_id, builder).await
    }

    async fn my_attempts(&self, exam_id: &str) -> Result<AttemptHistory, ClientError> {
        let request = self.client.get(self.url(exam_id, Some("my-attempts")));
        self.send_json("my_attempts", exam_id, request).await
    }
}

/// Prefers the `detail` or `message` field of a JSON error body over the raw text.
fn error_detail(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["detail", "message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
    });

    let detail = from_json.unwrap_or_else(|| body.trim().to_string());
    if detail.is_empty() {
        return "empty response body".to_string();
    }
    detail.chars().take(MAX_DETAIL_CHARS).collect()
}
