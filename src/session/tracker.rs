use time::OffsetDateTime;

use super::errors::SessionError;
use super::presented::PresentedQuestion;
use super::status::{QuestionStatus, StatusEvent};

/// The option a student picked, resolved back to its identity in the definition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnswerEntry {
    pub(crate) displayed_index: usize,
    pub(crate) original_index: usize,
    pub(crate) option_id: Option<String>,
    pub(crate) text: String,
    pub(crate) selected_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
struct QuestionRecord {
    status: QuestionStatus,
    answer: Option<AnswerEntry>,
    time_spent: u64,
}

/// Answers, statuses and dwell time per presented question position.
/// The answered bit of every status always matches whether an answer is stored.
#[derive(Debug, Clone)]
pub(crate) struct AnswerTracker {
    records: Vec<QuestionRecord>,
}

impl AnswerTracker {
    pub(crate) fn new(question_count: usize) -> Self {
        let records = (0..question_count)
            .map(|_| QuestionRecord {
                status: QuestionStatus::NotVisited,
                answer: None,
                time_spent: 0,
            })
            .collect();
        Self { records }
    }

    pub(crate) fn status(&self, position: usize) -> Option<QuestionStatus> {
        self.records.get(position).map(|record| record.status)
    }

    pub(crate) fn answer(&self, position: usize) -> Option<&AnswerEntry> {
        self.records.get(position).and_then(|record| record.answer.as_ref())
    }

    pub(crate) fn time_spent(&self, position: usize) -> u64 {
        self.records.get(position).map(|record| record.time_spent).unwrap_or(0)
    }

    pub(crate) fn statuses(&self) -> Vec<QuestionStatus> {
        self.records.iter().map(|record| record.status).collect()
    }

    pub(crate) fn visit(&mut self, position: usize) {
        if let Some(record) = self.records.get_mut(position) {
            if let Some(status) = record.status.apply(StatusEvent::Visit) {
                record.status = status;
            }
        }
    }

    pub(crate) fn credit_time(&mut self, position: usize, seconds: u64) {
        if let Some(record) = self.records.get_mut(position) {
            record.time_spent = record.time_spent.saturating_add(seconds);
        }
    }

    /// `option_index` is the displayed position; `option_text` must match what was displayed there.
    pub(crate) fn select_option(
        &mut self,
        position: usize,
        question: &PresentedQuestion,
        option_index: usize,
        option_text: &str,
        selected_at: OffsetDateTime,
    ) -> Result<&AnswerEntry, SessionError> {
        let option = question.options.get(option_index).ok_or_else(|| {
            SessionError::OptionOutOfRange {
                question_id: question.id.clone(),
                index: option_index,
                count: question.options.len(),
            }
        })?;

        if option.text != option_text {
            return Err(SessionError::OptionMismatch {
                question_id: question.id.clone(),
                index: option_index,
                displayed: option.text.clone(),
                given: option_text.to_string(),
            });
        }

        let record = self.record_mut(position, &question.id)?;
        record.status = record
            .status
            .apply(StatusEvent::Answer)
            .ok_or_else(|| SessionError::NotVisited(question.id.clone()))?;
        let entry = record.answer.insert(AnswerEntry {
            displayed_index: option_index,
            original_index: option.original_index,
            option_id: option.id.clone(),
            text: option.text.clone(),
            selected_at,
        });
        Ok(&*entry)
    }

    pub(crate) fn clear_response(
        &mut self,
        position: usize,
        question_id: &str,
    ) -> Result<QuestionStatus, SessionError> {
        let record = self.record_mut(position, question_id)?;
        record.status = record
            .status
            .apply(StatusEvent::Clear)
            .ok_or_else(|| SessionError::NotVisited(question_id.to_string()))?;
        record.answer = None;
        Ok(record.status)
    }

    pub(crate) fn toggle_mark(
        &mut self,
        position: usize,
        question_id: &str,
    ) -> Result<QuestionStatus, SessionError> {
        let record = self.record_mut(position, question_id)?;
        record.status = record
            .status
            .apply(StatusEvent::ToggleMark)
            .ok_or_else(|| SessionError::NotVisited(question_id.to_string()))?;
        Ok(record.status)
    }

    pub(crate) fn answered_count(&self) -> usize {
        self.records.iter().filter(|record| record.answer.is_some()).count()
    }

    pub(crate) fn marked_count(&self) -> usize {
        self.records.iter().filter(|record| record.status.is_marked()).count()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    fn record_mut(
        &mut self,
        position: usize,
        question_id: &str,
    ) -> Result<&mut QuestionRecord, SessionError> {
        self.records
            .get_mut(position)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::presented::PresentedOption;
    use time::macros::datetime;

    fn question() -> PresentedQuestion {
        // Displayed order differs from the definition order.
        PresentedQuestion {
            original_position: 0,
            id: "q1".to_string(),
            text: "Capital of France?".to_string(),
            points: 1.0,
            difficulty: None,
            options: vec![
                PresentedOption { original_index: 2, id: None, text: "Rome".to_string() },
                PresentedOption { original_index: 0, id: None, text: "Berlin".to_string() },
                PresentedOption {
                    original_index: 1,
                    id: Some("p".to_string()),
                    text: "Paris".to_string(),
                },
            ],
        }
    }

    fn assert_consistent(tracker: &AnswerTracker) {
        for position in 0..tracker.len() {
            let status = tracker.status(position).expect("status");
            assert_eq!(status.is_answered(), tracker.answer(position).is_some());
        }
    }

    #[test]
    fn select_resolves_displayed_index_to_original_identity() {
        let mut tracker = AnswerTracker::new(1);
        tracker.visit(0);
        let entry = tracker
            .select_option(0, &question(), 2, "Paris", datetime!(2025-01-01 10:00 UTC))
            .expect("select")
            .clone();

        assert_eq!(entry.displayed_index, 2);
        assert_eq!(entry.original_index, 1);
        assert_eq!(entry.option_id.as_deref(), Some("p"));
        assert_eq!(entry.text, "Paris");
        assert_eq!(tracker.status(0), Some(QuestionStatus::Answered));
        assert_consistent(&tracker);
    }

    #[test]
    fn select_rejects_text_that_was_not_displayed() {
        let mut tracker = AnswerTracker::new(1);
        let err = tracker
            .select_option(0, &question(), 0, "Paris", datetime!(2025-01-01 10:00 UTC))
            .expect_err("mismatch");
        assert!(matches!(err, SessionError::OptionMismatch { index: 0, .. }));
        assert!(tracker.answer(0).is_none());
    }

    #[test]
    fn select_rejects_out_of_range_option() {
        let mut tracker = AnswerTracker::new(1);
        let err = tracker
            .select_option(0, &question(), 3, "Paris", datetime!(2025-01-01 10:00 UTC))
            .expect_err("out of range");
        assert_eq!(
            err,
            SessionError::OptionOutOfRange { question_id: "q1".to_string(), index: 3, count: 3 }
        );
    }

    #[test]
    fn clear_removes_answer_and_returns_to_visited() {
        let mut tracker = AnswerTracker::new(1);
        tracker.visit(0);
        tracker
            .select_option(0, &question(), 1, "Berlin", datetime!(2025-01-01 10:00 UTC))
            .expect("select");
        tracker.toggle_mark(0, "q1").expect("mark");

        assert_eq!(tracker.clear_response(0, "q1"), Ok(QuestionStatus::Visited));
        assert!(tracker.answer(0).is_none());
        assert_eq!(tracker.marked_count(), 0);
        assert_consistent(&tracker);
    }

    #[test]
    fn mark_then_answer_then_unmark_keeps_answer() {
        let mut tracker = AnswerTracker::new(1);
        tracker.visit(0);
        assert_eq!(
            tracker.toggle_mark(0, "q1"),
            Ok(QuestionStatus::MarkedForReview { answered: false })
        );
        tracker
            .select_option(0, &question(), 0, "Rome", datetime!(2025-01-01 10:00 UTC))
            .expect("select");
        assert_eq!(tracker.status(0), Some(QuestionStatus::MarkedForReview { answered: true }));
        assert_eq!(tracker.toggle_mark(0, "q1"), Ok(QuestionStatus::Answered));
        assert_eq!(tracker.answered_count(), 1);
        assert_consistent(&tracker);
    }

    #[test]
    fn unseen_question_cannot_be_answered_marked_or_cleared() {
        let mut tracker = AnswerTracker::new(1);
        let err = tracker
            .select_option(0, &question(), 2, "Paris", datetime!(2025-01-01 10:00 UTC))
            .map(|_| ())
            .expect_err("not visited");
        assert_eq!(err, SessionError::NotVisited("q1".to_string()));
        assert_eq!(
            tracker.toggle_mark(0, "q1"),
            Err(SessionError::NotVisited("q1".to_string()))
        );
        assert_eq!(
            tracker.clear_response(0, "q1"),
            Err(SessionError::NotVisited("q1".to_string()))
        );
        assert_eq!(tracker.status(0), Some(QuestionStatus::NotVisited));
        assert!(tracker.answer(0).is_none());
    }

    #[test]
    fn credit_time_accumulates_per_question() {
        let mut tracker = AnswerTracker::new(2);
        tracker.credit_time(0, 1);
        tracker.credit_time(0, 1);
        tracker.credit_time(1, 1);
        tracker.credit_time(5, 1);
        assert_eq!(tracker.time_spent(0), 2);
        assert_eq!(tracker.time_spent(1), 1);
        assert_eq!(tracker.time_spent(5), 0);
    }
}
