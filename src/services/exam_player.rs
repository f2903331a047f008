use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Duration;

use crate::core::config::SessionSettings;
use crate::core::metrics;
use crate::core::time::now_utc;
use crate::schemas::attempt::AttemptHistory;
use crate::schemas::submission::SubmitRequest;
use crate::services::grading_client::{ClientError, GradingService};
use crate::session::errors::SessionError;
use crate::session::status::QuestionStatus;
use crate::session::submission::{
    SubmissionFailure, SubmissionPhase, SubmissionReceipt, SubmissionSummary,
};
use crate::session::tracker::AnswerEntry;
use crate::session::{ExamSession, SessionSnapshot, TickOutcome};
use crate::tasks::countdown::{CountdownTask, TickHandler};

/// Things that happen on the clock's schedule rather than in reply to a call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PlayerEvent {
    LowTime { remaining_seconds: u64 },
    TimeExpired,
    Submitted(SubmissionReceipt),
    SubmissionFailed(SubmissionFailure),
}

#[derive(Debug, Error)]
pub(crate) enum SubmitError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("another submission is already in progress")]
    InFlight,
    #[error("submission failed: {}", .0.message)]
    Failed(SubmissionFailure),
}

struct PlayerCore {
    exam_id: String,
    session: Mutex<ExamSession>,
    client: Arc<dyn GradingService>,
    events: mpsc::UnboundedSender<PlayerEvent>,
    low_time_warning_seconds: u64,
    low_time_sent: AtomicBool,
}

impl PlayerCore {
    fn emit(&self, event: PlayerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!(exam_id = %self.exam_id, "Player event dropped; no listener");
        }
    }

    /// Sends with the session unlocked, then applies the outcome under the lock.
    async fn deliver(
        &self,
        request: SubmitRequest,
    ) -> Result<SubmissionReceipt, SubmissionFailure> {
        let trigger = request.trigger;
        tracing::info!(
            exam_id = %self.exam_id,
            trigger = trigger.as_str(),
            answered = request.answers.iter().filter(|answer| answer.is_answered()).count(),
            questions = request.answers.len(),
            "Sending exam submission"
        );
        let timer = Instant::now();
        let result = self.client.submit(&self.exam_id, &request).await;
        let elapsed = timer.elapsed();

        let outcome = result.map_err(|err| SubmissionFailure {
            message: err.to_string(),
            status: err.status(),
        });

        let (phase, attempt) = {
            let mut session = self.session.lock().await;
            let phase = session.complete_submission(trigger, request.submitted_at, outcome).clone();
            (phase, session.submission_attempts())
        };

        match phase {
            SubmissionPhase::Succeeded(receipt) => {
                metrics::record_submission(trigger.as_str(), "success", elapsed);
                tracing::info!(
                    exam_id = %self.exam_id,
                    trigger = trigger.as_str(),
                    attempt,
                    attempt_id = receipt.attempt_id.as_deref().unwrap_or("-"),
                    "Exam submitted"
                );
                self.emit(PlayerEvent::Submitted(receipt.clone()));
                Ok(receipt)
            }
            SubmissionPhase::Failed(failure) => {
                metrics::record_submission(trigger.as_str(), "failed", elapsed);
                tracing::warn!(
                    exam_id = %self.exam_id,
                    trigger = trigger.as_str(),
                    attempt,
                    status = failure.status,
                    error = %failure.message,
                    "Exam submission failed"
                );
                self.emit(PlayerEvent::SubmissionFailed(failure.clone()));
                Err(failure)
            }
            other => Err(SubmissionFailure {
                message: format!("submission ended in unexpected phase '{}'", other.as_str()),
                status: None,
            }),
        }
    }
}

#[async_trait]
impl TickHandler for PlayerCore {
    async fn on_tick(&self) -> ControlFlow<()> {
        let outcome = self.session.lock().await.tick(now_utc());
        match outcome {
            TickOutcome::Idle => ControlFlow::Break(()),
            TickOutcome::Paused => ControlFlow::Continue(()),
            TickOutcome::Running { remaining } => {
                if self.low_time_warning_seconds > 0
                    && remaining <= self.low_time_warning_seconds
                    && !self.low_time_sent.swap(true, Ordering::SeqCst)
                {
                    self.emit(PlayerEvent::LowTime { remaining_seconds: remaining });
                }
                ControlFlow::Continue(())
            }
            TickOutcome::Expired { submission } => {
                self.emit(PlayerEvent::TimeExpired);
                if let Some(request) = submission {
                    // Failures are reported through events; the student retries by hand.
                    let _ = self.deliver(request).await;
                }
                ControlFlow::Break(())
            }
        }
    }
}

/// Each countdown tick takes exactly one second off the session clock.
const CLOCK_PERIOD: Duration = Duration::from_secs(1);

/// Async handle around one exam session: drives its clock and talks to the grading service.
pub(crate) struct ExamPlayer {
    core: Arc<PlayerCore>,
    countdown: Mutex<Option<CountdownTask>>,
}

impl ExamPlayer {
    pub(crate) fn new(
        session: ExamSession,
        client: Arc<dyn GradingService>,
        settings: &SessionSettings,
    ) -> (Self, mpsc::UnboundedReceiver<PlayerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let core = PlayerCore {
            exam_id: session.exam_id().to_string(),
            session: Mutex::new(session),
            client,
            events,
            low_time_warning_seconds: settings.low_time_warning_seconds,
            low_time_sent: AtomicBool::new(false),
        };

        let player = Self {
            core: Arc::new(core),
            countdown: Mutex::new(None),
        };
        (player, receiver)
    }

    /// Starts the session and its countdown task.
    pub(crate) async fn start(&self) -> Result<(), SessionError> {
        self.core.session.lock().await.start(now_utc())?;
        let task = CountdownTask::spawn(self.core.clone(), CLOCK_PERIOD);
        *self.countdown.lock().await = Some(task);
        Ok(())
    }

    /// Read-only access for rendering.
    pub(crate) async fn inspect<R>(&self, view: impl FnOnce(&ExamSession) -> R) -> R {
        let session = self.core.session.lock().await;
        view(&session)
    }

    pub(crate) async fn snapshot(&self) -> SessionSnapshot {
        self.core.session.lock().await.snapshot()
    }

    pub(crate) async fn select_option(
        &self,
        question_id: &str,
        option_index: usize,
        option_text: &str,
    ) -> Result<AnswerEntry, SessionError> {
        let mut session = self.core.session.lock().await;
        session.select_option(question_id, option_index, option_text, now_utc()).cloned()
    }

    pub(crate) async fn clear_response(
        &self,
        question_id: &str,
    ) -> Result<QuestionStatus, SessionError> {
        self.core.session.lock().await.clear_response(question_id)
    }

    pub(crate) async fn mark_for_review(
        &self,
        question_id: &str,
    ) -> Result<QuestionStatus, SessionError> {
        self.core.session.lock().await.mark_for_review(question_id)
    }

    pub(crate) async fn next(&self) -> Result<usize, SessionError> {
        self.core.session.lock().await.next()
    }

    pub(crate) async fn previous(&self) -> Result<usize, SessionError> {
        self.core.session.lock().await.previous()
    }

    pub(crate) async fn go_to(&self, index: usize) -> Result<usize, SessionError> {
        self.core.session.lock().await.go_to(index)
    }

    pub(crate) async fn pause(&self) -> Result<(), SessionError> {
        self.core.session.lock().await.pause()
    }

    pub(crate) async fn resume(&self) -> Result<(), SessionError> {
        self.core.session.lock().await.resume()
    }

    pub(crate) async fn request_submit(&self) -> Result<SubmissionSummary, SessionError> {
        self.core.session.lock().await.request_submit()
    }

    pub(crate) async fn cancel_submit(&self) -> Result<(), SessionError> {
        self.core.session.lock().await.cancel_submit()
    }

    pub(crate) async fn confirm_submit(&self) -> Result<SubmissionReceipt, SubmitError> {
        let request = self.core.session.lock().await.confirm_submit(now_utc())?;
        self.send(request).await
    }

    pub(crate) async fn retry_submission(&self) -> Result<SubmissionReceipt, SubmitError> {
        let request = self.core.session.lock().await.retry_submission(now_utc())?;
        self.send(request).await
    }

    pub(crate) async fn history(&self) -> Result<AttemptHistory, ClientError> {
        self.core.client.my_attempts(&self.core.exam_id).await
    }

    /// Stops the clock. Refused while the grading service still owes an answer.
    pub(crate) async fn exit(&self) -> Result<(), SessionError> {
        self.core.session.lock().await.ensure_can_exit()?;
        self.stop_countdown().await;
        tracing::info!(exam_id = %self.core.exam_id, "Exam player exited");
        Ok(())
    }

    async fn send(
        &self,
        request: Option<SubmitRequest>,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let request = request.ok_or(SubmitError::InFlight)?;
        let receipt = self.core.deliver(request).await.map_err(SubmitError::Failed)?;
        self.stop_countdown().await;
        Ok(receipt)
    }

    async fn stop_countdown(&self) {
        let task = self.countdown.lock().await.take();
        if let Some(task) = task {
            task.stop().await;
        }
    }
}

#[cfg(test)]
mod tests;
