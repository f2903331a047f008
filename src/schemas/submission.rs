use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Reported for questions left unanswered; never a valid option index.
pub(crate) const NO_SELECTION: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SubmitTrigger {
    Manual,
    Timeout,
}

impl SubmitTrigger {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnswerPayload {
    pub(crate) question_id: String,
    /// Index of the option in the exam definition, or [`NO_SELECTION`].
    pub(crate) selected_option: i32,
    pub(crate) selected_option_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) selected_option_id: Option<String>,
    pub(crate) time_spent: u64,
}

impl AnswerPayload {
    pub(crate) fn is_answered(&self) -> bool {
        self.selected_option != NO_SELECTION
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitRequest {
    pub(crate) answers: Vec<AnswerPayload>,
    pub(crate) time_spent: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) submitted_at: OffsetDateTime,
    pub(crate) trigger: SubmitTrigger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SubmitResponse {
    #[serde(default = "default_success")]
    pub(crate) success: bool,
    #[serde(default, alias = "attemptId")]
    pub(crate) attempt_id: Option<String>,
    #[serde(default)]
    pub(crate) score: Option<f64>,
    #[serde(default, alias = "maxScore", alias = "totalMarks")]
    pub(crate) max_score: Option<f64>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

fn default_success() -> bool {
    true
}
