use time::OffsetDateTime;

use crate::schemas::submission::SubmitTrigger;

use super::errors::SessionError;

/// Counts shown before the student confirms a manual submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SubmissionSummary {
    pub(crate) total: usize,
    pub(crate) answered: usize,
    pub(crate) skipped: usize,
    pub(crate) marked: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubmissionReceipt {
    pub(crate) attempt_id: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) max_score: Option<f64>,
    pub(crate) trigger: SubmitTrigger,
    pub(crate) submitted_at: OffsetDateTime,
}

/// Why the grading service did not accept a submission. Always retryable by the student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubmissionFailure {
    pub(crate) message: String,
    pub(crate) status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SubmissionPhase {
    Idle,
    Confirming(SubmissionSummary),
    Submitting(SubmitTrigger),
    Failed(SubmissionFailure),
    Succeeded(SubmissionReceipt),
}

impl SubmissionPhase {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Confirming(_) => "confirming",
            Self::Submitting(_) => "submitting",
            Self::Failed(_) => "failed",
            Self::Succeeded(_) => "submitted",
        }
    }
}

/// Submission state machine. Moving into `Submitting` is the single guard that keeps
/// the timer and the submit button from both sending the answers.
#[derive(Debug, Clone)]
pub(crate) struct SubmissionCoordinator {
    phase: SubmissionPhase,
    attempts: u32,
}

impl SubmissionCoordinator {
    pub(crate) fn new() -> Self {
        Self { phase: SubmissionPhase::Idle, attempts: 0 }
    }

    pub(crate) fn phase(&self) -> &SubmissionPhase {
        &self.phase
    }

    /// Number of requests handed out for sending.
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        matches!(self.phase, SubmissionPhase::Submitting(_))
    }

    pub(crate) fn is_succeeded(&self) -> bool {
        matches!(self.phase, SubmissionPhase::Succeeded(_))
    }

    pub(crate) fn request_confirmation(
        &mut self,
        summary: SubmissionSummary,
    ) -> Result<(), SessionError> {
        match self.phase {
            SubmissionPhase::Idle | SubmissionPhase::Failed(_) | SubmissionPhase::Confirming(_) => {
                self.phase = SubmissionPhase::Confirming(summary);
                Ok(())
            }
            SubmissionPhase::Submitting(_) => Err(SessionError::SubmissionInFlight),
            SubmissionPhase::Succeeded(_) => Err(SessionError::Terminal),
        }
    }

    pub(crate) fn cancel(&mut self) -> Result<(), SessionError> {
        match self.phase {
            SubmissionPhase::Confirming(_) => {
                self.phase = SubmissionPhase::Idle;
                Ok(())
            }
            _ => Err(SessionError::NotConfirming),
        }
    }

    /// Returns `Ok(false)` when another submission already holds the guard.
    pub(crate) fn begin_confirmed(&mut self) -> Result<bool, SessionError> {
        match self.phase {
            SubmissionPhase::Confirming(_) => Ok(self.enter_submitting(SubmitTrigger::Manual)),
            SubmissionPhase::Submitting(_) => Ok(false),
            SubmissionPhase::Succeeded(_) => Err(SessionError::Terminal),
            SubmissionPhase::Idle | SubmissionPhase::Failed(_) => Err(SessionError::NotConfirming),
        }
    }

    pub(crate) fn begin_retry(&mut self) -> Result<bool, SessionError> {
        match self.phase {
            SubmissionPhase::Failed(_) => Ok(self.enter_submitting(SubmitTrigger::Manual)),
            SubmissionPhase::Submitting(_) => Ok(false),
            SubmissionPhase::Succeeded(_) => Err(SessionError::Terminal),
            SubmissionPhase::Idle | SubmissionPhase::Confirming(_) => {
                Err(SessionError::NothingToRetry)
            }
        }
    }

    /// Timer expiry skips confirmation. A failed earlier attempt is never resent
    /// automatically, and an in-flight one wins.
    pub(crate) fn begin_timeout(&mut self) -> bool {
        match self.phase {
            SubmissionPhase::Idle | SubmissionPhase::Confirming(_) => {
                self.enter_submitting(SubmitTrigger::Timeout)
            }
            _ => false,
        }
    }

    pub(crate) fn complete(&mut self, outcome: Result<SubmissionReceipt, SubmissionFailure>) {
        if !self.is_in_flight() {
            tracing::warn!(
                phase = self.phase.as_str(),
                "Ignoring submission outcome without a request in flight"
            );
            return;
        }

        self.phase = match outcome {
            Ok(receipt) => SubmissionPhase::Succeeded(receipt),
            Err(failure) => SubmissionPhase::Failed(failure),
        };
    }

    fn enter_submitting(&mut self, trigger: SubmitTrigger) -> bool {
        self.phase = SubmissionPhase::Submitting(trigger);
        self.attempts += 1;
        true
    }
}
