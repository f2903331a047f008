use thiserror::Error;
use validator::Validate;

use crate::schemas::exam::ExamDefinition;
use crate::services::grading_client::{ClientError, GradingService};
use crate::services::retake_policy::{self, RetakeDecision};
use crate::services::shuffle::ShufflePlan;
use crate::session::ExamSession;

/// Why no session could be created. Every variant is safe to retry by launching again.
#[derive(Debug, Error)]
pub(crate) enum LoadError {
    #[error("could not load the exam: {0}")]
    Fetch(#[source] ClientError),
    #[error("the exam definition is invalid: {0}")]
    Invalid(String),
    #[error("no attempts left: {used} of {allowed} used")]
    RetakeBlocked { used: u32, allowed: u32 },
}

/// What the student sees before pressing start.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExamIntro {
    pub(crate) exam_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) question_count: usize,
    pub(crate) total_points: f64,
    pub(crate) duration_minutes: u32,
    pub(crate) negative_marking: String,
    pub(crate) passing_score: Option<f64>,
    pub(crate) attempts_used: Option<u32>,
    pub(crate) attempts_allowed: Option<u32>,
    pub(crate) shuffle_seed: u64,
}

#[derive(Debug)]
pub(crate) struct LaunchedSession {
    pub(crate) intro: ExamIntro,
    pub(crate) session: ExamSession,
}

/// Fetches, validates, applies the retake limit and shuffles. The session comes back
/// in its intro phase with the clock not yet running.
pub(crate) async fn launch(
    client: &dyn GradingService,
    exam_id: &str,
    seed: Option<u64>,
) -> Result<LaunchedSession, LoadError> {
    let definition = client.fetch_exam(exam_id).await.map_err(LoadError::Fetch)?;
    validate_definition(&definition)?;

    let attempts_allowed = retake_policy::attempts_allowed(&definition);
    let attempts_used = if retake_policy::requires_history(&definition) {
        let history = client.my_attempts(exam_id).await.map_err(LoadError::Fetch)?;
        if let RetakeDecision::Blocked { used, allowed } =
            retake_policy::evaluate(&definition, &history)
        {
            tracing::info!(exam_id, used, allowed, "Exam retake blocked");
            return Err(LoadError::RetakeBlocked { used, allowed });
        }
        Some(history.attempts_used())
    } else {
        None
    };

    let plan = ShufflePlan::new(seed);
    let intro = ExamIntro {
        exam_id: definition.id.clone(),
        title: definition.title.clone(),
        description: definition.description.clone(),
        question_count: definition.questions.len(),
        total_points: definition.total_points(),
        duration_minutes: definition.duration,
        negative_marking: definition.negative_marking_policy(),
        passing_score: definition.passing_score,
        attempts_used,
        attempts_allowed,
        shuffle_seed: plan.seed(),
    };

    let session = ExamSession::new(plan.present(definition));
    tracing::info!(
        exam_id,
        session_id = %session.id(),
        questions = intro.question_count,
        shuffle_seed = intro.shuffle_seed,
        "Exam session prepared"
    );

    Ok(LaunchedSession { intro, session })
}

fn validate_definition(definition: &ExamDefinition) -> Result<(), LoadError> {
    definition.validate().map_err(|errors| {
        tracing::warn!(exam_id = %definition.id, errors = %errors, "Rejected exam definition");
        LoadError::Invalid(errors.to_string())
    })
}
