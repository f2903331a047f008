use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct AttemptSummary {
    #[serde(alias = "_id")]
    pub(crate) id: String,
    #[serde(default, alias = "attemptNumber")]
    pub(crate) attempt_number: Option<u32>,
    #[serde(default)]
    pub(crate) score: Option<f64>,
    #[serde(default, alias = "maxScore", alias = "totalMarks")]
    pub(crate) max_score: Option<f64>,
    #[serde(default)]
    pub(crate) percentage: Option<f64>,
    #[serde(default, alias = "submittedAt", with = "time::serde::rfc3339::option")]
    pub(crate) submitted_at: Option<time::OffsetDateTime>,
    #[serde(default, alias = "timeSpent")]
    pub(crate) time_spent: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct AttemptStats {
    #[serde(default, alias = "bestScore")]
    pub(crate) best_score: f64,
    #[serde(default, alias = "averageScore")]
    pub(crate) average_score: f64,
    #[serde(default, alias = "totalAttempts")]
    pub(crate) total_attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct AttemptHistory {
    #[serde(default)]
    pub(crate) attempts: Vec<AttemptSummary>,
    #[serde(default)]
    pub(crate) stats: AttemptStats,
}

impl AttemptHistory {
    /// Servers that omit `stats` still list attempts, so fall back to counting them.
    pub(crate) fn attempts_used(&self) -> u32 {
        let listed = u32::try_from(self.attempts.len()).unwrap_or(u32::MAX);
        self.stats.total_attempts.max(listed)
    }
}
