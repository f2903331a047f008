use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum SessionError {
    #[error("the exam has not been started yet")]
    NotStarted,
    #[error("the exam has already been started")]
    AlreadyStarted,
    #[error("the exam has been submitted; answers are read-only")]
    Terminal,
    #[error("time is up; answers can no longer be changed")]
    TimeExpired,
    #[error("a submission is in progress")]
    SubmissionInFlight,
    #[error("finish or cancel the submit confirmation first")]
    ConfirmationPending,
    #[error("there is no submission waiting for confirmation")]
    NotConfirming,
    #[error("there is no failed submission to retry")]
    NothingToRetry,
    #[error("question '{0}' has not been opened yet")]
    NotVisited(String),
    #[error("unknown question '{0}'")]
    UnknownQuestion(String),
    #[error("question '{question_id}' has no option {index} (it has {count})")]
    OptionOutOfRange { question_id: String, index: usize, count: usize },
    #[error("option {index} of question '{question_id}' reads '{displayed}', not '{given}'")]
    OptionMismatch { question_id: String, index: usize, displayed: String, given: String },
}
