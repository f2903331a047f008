use crate::schemas::attempt::AttemptHistory;
use crate::schemas::exam::ExamDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetakeDecision {
    Allowed,
    Blocked { used: u32, allowed: u32 },
}

/// Whether the attempt history has to be consulted before a new session may start.
pub(crate) fn requires_history(exam: &ExamDefinition) -> bool {
    exam.max_attempts.is_some() || !exam.allow_retake
}

/// Number of attempts the exam allows in total, if limited.
pub(crate) fn attempts_allowed(exam: &ExamDefinition) -> Option<u32> {
    let retake_cap = if exam.allow_retake { None } else { Some(1) };
    match (exam.max_attempts, retake_cap) {
        (Some(max), Some(cap)) => Some(max.min(cap)),
        (max, cap) => max.or(cap),
    }
}

pub(crate) fn evaluate(exam: &ExamDefinition, history: &AttemptHistory) -> RetakeDecision {
    let used = history.attempts_used();
    match attempts_allowed(exam) {
        Some(allowed) if used >= allowed => RetakeDecision::Blocked { used, allowed },
        _ => RetakeDecision::Allowed,
    }
}
