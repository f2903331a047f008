//! In-memory exam session: answers, navigation, countdown and submission phases.
//!
//! Everything here is synchronous and free of I/O. The player in
//! `services::exam_player` wraps a session in a mutex, drives its clock from a
//! background task and performs the network calls the session hands out.

pub(crate) mod countdown;
pub(crate) mod errors;
pub(crate) mod navigator;
pub(crate) mod presented;
pub(crate) mod status;
pub(crate) mod submission;
pub(crate) mod tracker;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::schemas::submission::{
    AnswerPayload, SubmitRequest, SubmitResponse, SubmitTrigger, NO_SELECTION,
};

use countdown::{Countdown, Tick};
use errors::SessionError;
use navigator::Navigator;
use presented::{PresentedExam, PresentedQuestion};
use status::QuestionStatus;
use submission::{
    SubmissionCoordinator, SubmissionFailure, SubmissionPhase, SubmissionReceipt,
    SubmissionSummary,
};
use tracker::{AnswerEntry, AnswerTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionPhase {
    /// Rules are on screen; the clock has not started.
    Intro,
    InProgress,
    /// Submission accepted. Nothing but navigation is allowed.
    Terminal,
}

/// What a clock tick did to the session.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TickOutcome {
    Idle,
    Paused,
    Running { remaining: u64 },
    /// Time ran out. Carries the automatic submission when this tick won the guard.
    Expired { submission: Option<SubmitRequest> },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SessionSnapshot {
    pub(crate) phase: SessionPhase,
    pub(crate) active_index: usize,
    pub(crate) question_count: usize,
    pub(crate) remaining_seconds: u64,
    pub(crate) is_paused: bool,
    pub(crate) statuses: Vec<QuestionStatus>,
    pub(crate) submission: SubmissionPhase,
}

/// One question as the student currently sees it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QuestionView<'a> {
    pub(crate) index: usize,
    pub(crate) question: &'a PresentedQuestion,
    pub(crate) status: QuestionStatus,
    pub(crate) answer: Option<&'a AnswerEntry>,
}

#[derive(Debug)]
pub(crate) struct ExamSession {
    id: Uuid,
    exam: PresentedExam,
    tracker: AnswerTracker,
    navigator: Navigator,
    countdown: Countdown,
    submission: SubmissionCoordinator,
    phase: SessionPhase,
    started_at: Option<OffsetDateTime>,
}

impl ExamSession {
    pub(crate) fn new(exam: PresentedExam) -> Self {
        let count = exam.len();
        let duration = exam.definition().duration_seconds();
        Self {
            id: Uuid::new_v4(),
            tracker: AnswerTracker::new(count),
            navigator: Navigator::new(count),
            countdown: Countdown::new(duration),
            submission: SubmissionCoordinator::new(),
            phase: SessionPhase::Intro,
            started_at: None,
            exam,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn exam(&self) -> &PresentedExam {
        &self.exam
    }

    pub(crate) fn exam_id(&self) -> &str {
        &self.exam.definition().id
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub(crate) fn remaining_seconds(&self) -> u64 {
        self.countdown.remaining()
    }

    pub(crate) fn submission_attempts(&self) -> u32 {
        self.submission.attempts()
    }

    /// Leaves the intro gate and starts the clock. The first question counts as visited.
    pub(crate) fn start(&mut self, now: OffsetDateTime) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Intro => {}
            SessionPhase::InProgress => return Err(SessionError::AlreadyStarted),
            SessionPhase::Terminal => return Err(SessionError::Terminal),
        }

        self.phase = SessionPhase::InProgress;
        self.started_at = Some(now);
        self.tracker.visit(self.navigator.active());
        tracing::info!(
            session_id = %self.id,
            exam_id = %self.exam_id(),
            questions = self.exam.len(),
            remaining_seconds = self.countdown.remaining(),
            "Exam session started"
        );
        Ok(())
    }

    pub(crate) fn select_option(
        &mut self,
        question_id: &str,
        option_index: usize,
        option_text: &str,
        now: OffsetDateTime,
    ) -> Result<&AnswerEntry, SessionError> {
        self.ensure_answers_editable()?;
        let position = self.position(question_id)?;
        let question = self
            .exam
            .question(position)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;
        self.tracker.select_option(position, question, option_index, option_text, now)
    }

    pub(crate) fn clear_response(
        &mut self,
        question_id: &str,
    ) -> Result<QuestionStatus, SessionError> {
        self.ensure_answers_editable()?;
        let position = self.position(question_id)?;
        self.tracker.clear_response(position, question_id)
    }

    pub(crate) fn mark_for_review(
        &mut self,
        question_id: &str,
    ) -> Result<QuestionStatus, SessionError> {
        self.ensure_answers_editable()?;
        let position = self.position(question_id)?;
        self.tracker.toggle_mark(position, question_id)
    }

    pub(crate) fn next(&mut self) -> Result<usize, SessionError> {
        self.ensure_started()?;
        let index = self.navigator.next();
        self.tracker.visit(index);
        Ok(index)
    }

    pub(crate) fn previous(&mut self) -> Result<usize, SessionError> {
        self.ensure_started()?;
        let index = self.navigator.previous();
        self.tracker.visit(index);
        Ok(index)
    }

    pub(crate) fn go_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.ensure_started()?;
        let index = self.navigator.go_to(index);
        self.tracker.visit(index);
        Ok(index)
    }

    /// `None` only for an exam without questions, which validation rejects.
    pub(crate) fn active_question(&self) -> Option<QuestionView<'_>> {
        self.question_view(self.navigator.active())
    }

    pub(crate) fn question_view(&self, index: usize) -> Option<QuestionView<'_>> {
        let question = self.exam.question(index)?;
        Some(QuestionView {
            index,
            question,
            status: self.tracker.status(index)?,
            answer: self.tracker.answer(index),
        })
    }

    pub(crate) fn pause(&mut self) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.countdown.pause()
    }

    pub(crate) fn resume(&mut self) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.countdown.resume()
    }

    pub(crate) fn tick(&mut self, now: OffsetDateTime) -> TickOutcome {
        if self.phase != SessionPhase::InProgress {
            return TickOutcome::Idle;
        }

        match self.countdown.tick() {
            Tick::Stopped => TickOutcome::Idle,
            Tick::Paused => TickOutcome::Paused,
            Tick::Running { remaining } => {
                self.tracker.credit_time(self.navigator.active(), 1);
                TickOutcome::Running { remaining }
            }
            Tick::Expired => {
                self.tracker.credit_time(self.navigator.active(), 1);
                let submission = if self.submission.begin_timeout() {
                    Some(self.build_request(SubmitTrigger::Timeout, now))
                } else {
                    None
                };
                tracing::info!(
                    session_id = %self.id,
                    auto_submit = submission.is_some(),
                    submission_phase = self.submission.phase().as_str(),
                    "Exam time expired"
                );
                TickOutcome::Expired { submission }
            }
        }
    }

    pub(crate) fn summary(&self) -> SubmissionSummary {
        let total = self.tracker.len();
        let answered = self.tracker.answered_count();
        SubmissionSummary {
            total,
            answered,
            skipped: total - answered,
            marked: self.tracker.marked_count(),
        }
    }

    /// Opens the confirmation step of a manual submission.
    pub(crate) fn request_submit(&mut self) -> Result<SubmissionSummary, SessionError> {
        self.ensure_started()?;
        let summary = self.summary();
        self.submission.request_confirmation(summary)?;
        Ok(summary)
    }

    pub(crate) fn cancel_submit(&mut self) -> Result<(), SessionError> {
        self.ensure_started()?;
        self.submission.cancel()
    }

    /// Hands out the request to send, or `None` when a submission is already in flight.
    pub(crate) fn confirm_submit(
        &mut self,
        now: OffsetDateTime,
    ) -> Result<Option<SubmitRequest>, SessionError> {
        self.ensure_started()?;
        if self.submission.begin_confirmed()? {
            Ok(Some(self.build_request(SubmitTrigger::Manual, now)))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn retry_submission(
        &mut self,
        now: OffsetDateTime,
    ) -> Result<Option<SubmitRequest>, SessionError> {
        self.ensure_started()?;
        if self.submission.begin_retry()? {
            Ok(Some(self.build_request(SubmitTrigger::Manual, now)))
        } else {
            Ok(None)
        }
    }

    /// Applies the grading service's answer to the in-flight submission.
    pub(crate) fn complete_submission(
        &mut self,
        trigger: SubmitTrigger,
        submitted_at: OffsetDateTime,
        outcome: Result<SubmitResponse, SubmissionFailure>,
    ) -> &SubmissionPhase {
        let outcome = outcome.and_then(|response| {
            if response.success {
                Ok(SubmissionReceipt {
                    attempt_id: response.attempt_id,
                    score: response.score,
                    max_score: response.max_score,
                    trigger,
                    submitted_at,
                })
            } else {
                let message = response
                    .message
                    .unwrap_or_else(|| "the grading service rejected the submission".to_string());
                Err(SubmissionFailure { message, status: None })
            }
        });

        self.submission.complete(outcome);
        if self.submission.is_succeeded() {
            self.phase = SessionPhase::Terminal;
            self.countdown.stop();
        }
        self.submission.phase()
    }

    /// Leaving is refused while the grading service still owes an answer.
    pub(crate) fn ensure_can_exit(&self) -> Result<(), SessionError> {
        if self.submission.is_in_flight() {
            return Err(SessionError::SubmissionInFlight);
        }
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            active_index: self.navigator.active(),
            question_count: self.exam.len(),
            remaining_seconds: self.countdown.remaining(),
            is_paused: self.countdown.is_paused(),
            statuses: self.tracker.statuses(),
            submission: self.submission.phase().clone(),
        }
    }

    /// One entry per presented question, in presented order; unanswered ones carry the sentinel.
    fn build_request(&self, trigger: SubmitTrigger, now: OffsetDateTime) -> SubmitRequest {
        let answers = self
            .exam
            .questions()
            .iter()
            .enumerate()
            .map(|(position, question)| {
                let time_spent = self.tracker.time_spent(position);
                match self.tracker.answer(position) {
                    Some(entry) => AnswerPayload {
                        question_id: question.id.clone(),
                        selected_option: i32::try_from(entry.original_index)
                            .unwrap_or(NO_SELECTION),
                        selected_option_text: Some(entry.text.clone()),
                        selected_option_id: entry.option_id.clone(),
                        time_spent,
                    },
                    None => AnswerPayload {
                        question_id: question.id.clone(),
                        selected_option: NO_SELECTION,
                        selected_option_text: None,
                        selected_option_id: None,
                        time_spent,
                    },
                }
            })
            .collect();

        SubmitRequest {
            answers,
            time_spent: self.countdown.elapsed(),
            started_at: self.started_at.unwrap_or(now),
            submitted_at: now,
            trigger,
        }
    }

    fn position(&self, question_id: &str) -> Result<usize, SessionError> {
        self.exam
            .position_of(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))
    }

    fn ensure_started(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Intro => Err(SessionError::NotStarted),
            SessionPhase::InProgress | SessionPhase::Terminal => Ok(()),
        }
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Intro => Err(SessionError::NotStarted),
            SessionPhase::Terminal => Err(SessionError::Terminal),
            SessionPhase::InProgress => Ok(()),
        }
    }

    fn ensure_answers_editable(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Intro => return Err(SessionError::NotStarted),
            SessionPhase::Terminal => return Err(SessionError::Terminal),
            SessionPhase::InProgress => {}
        }

        match self.submission.phase() {
            SubmissionPhase::Submitting(_) => return Err(SessionError::SubmissionInFlight),
            SubmissionPhase::Confirming(_) => return Err(SessionError::ConfirmationPending),
            SubmissionPhase::Succeeded(_) => return Err(SessionError::Terminal),
            SubmissionPhase::Idle | SubmissionPhase::Failed(_) => {}
        }

        if self.countdown.is_expired() {
            return Err(SessionError::TimeExpired);
        }
        Ok(())
    }
}

#[cfg(test)]
impl ExamSession {
    pub(crate) fn status_of(&self, question_id: &str) -> Option<QuestionStatus> {
        self.exam.position_of(question_id).and_then(|position| self.tracker.status(position))
    }

    pub(crate) fn answer_for(&self, question_id: &str) -> Option<&AnswerEntry> {
        self.exam.position_of(question_id).and_then(|position| self.tracker.answer(position))
    }
}
