use std::fmt;

/// Per-question progress. A review mark rides on top of the answered bit so that
/// unmarking never loses an existing answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuestionStatus {
    NotVisited,
    Visited,
    Answered,
    MarkedForReview { answered: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusEvent {
    Visit,
    Answer,
    Clear,
    ToggleMark,
}

impl QuestionStatus {
    /// Next status for `event`, or `None` when the edge does not exist. A question
    /// that was never shown can only be visited.
    pub(crate) fn apply(self, event: StatusEvent) -> Option<Self> {
        use QuestionStatus::*;

        let next = match (self, event) {
            (NotVisited, StatusEvent::Visit) => Visited,
            (NotVisited, _) => return None,
            (status, StatusEvent::Visit) => status,

            (MarkedForReview { .. }, StatusEvent::Answer) => MarkedForReview { answered: true },
            (_, StatusEvent::Answer) => Answered,

            // Clearing drops the answer and the review mark together.
            (_, StatusEvent::Clear) => Visited,

            (MarkedForReview { answered: true }, StatusEvent::ToggleMark) => Answered,
            (MarkedForReview { answered: false }, StatusEvent::ToggleMark) => Visited,
            (Answered, StatusEvent::ToggleMark) => MarkedForReview { answered: true },
            (Visited, StatusEvent::ToggleMark) => MarkedForReview { answered: false },
        };
        Some(next)
    }

    pub(crate) fn is_answered(self) -> bool {
        matches!(self, Self::Answered | Self::MarkedForReview { answered: true })
    }

    pub(crate) fn is_marked(self) -> bool {
        matches!(self, Self::MarkedForReview { .. })
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::NotVisited => "not-visited",
            Self::Visited => "visited",
            Self::Answered => "answered",
            Self::MarkedForReview { answered: true } => "answered+marked",
            Self::MarkedForReview { answered: false } => "marked-for-review",
        }
    }
}

impl fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
