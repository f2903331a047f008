use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Options arrive either as bare strings or as `{id, text}` objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawOption {
    Text(String),
    Object {
        #[serde(default, alias = "_id")]
        id: Option<String>,
        #[serde(alias = "label")]
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(from = "RawOption")]
pub(crate) struct OptionDefinition {
    pub(crate) id: Option<String>,
    #[validate(length(min = 1, message = "option text must not be empty"))]
    pub(crate) text: String,
}

impl From<RawOption> for OptionDefinition {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Text(text) => Self { id: None, text },
            RawOption::Object { id, text } => Self { id, text },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct QuestionDefinition {
    #[serde(alias = "_id")]
    #[validate(length(min = 1, message = "question id must not be empty"))]
    pub(crate) id: String,
    #[serde(alias = "question")]
    #[validate(length(min = 1, message = "question text must not be empty"))]
    pub(crate) text: String,
    #[validate(length(min = 2, message = "a question needs at least two options"), nested)]
    pub(crate) options: Vec<OptionDefinition>,
    #[serde(default = "default_points", alias = "marks")]
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
    #[serde(default)]
    pub(crate) difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_unique_question_ids"))]
pub(crate) struct ExamDefinition {
    #[serde(alias = "_id")]
    #[validate(length(min = 1, message = "exam id must not be empty"))]
    pub(crate) id: String,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    /// Minutes.
    #[serde(alias = "durationMinutes", alias = "duration_minutes")]
    #[validate(range(min = 1, message = "duration must be at least one minute"))]
    pub(crate) duration: u32,
    #[validate(length(min = 1, message = "an exam needs at least one question"), nested)]
    pub(crate) questions: Vec<QuestionDefinition>,
    #[serde(default, alias = "shuffleQuestions")]
    pub(crate) shuffle_questions: bool,
    #[serde(default, alias = "shuffleOptions")]
    pub(crate) shuffle_options: bool,
    #[serde(default, alias = "negativeMarking")]
    pub(crate) negative_marking: bool,
    #[serde(default, alias = "negativeMarkValue")]
    #[validate(range(min = 0.0, message = "negative_mark_value must be non-negative"))]
    pub(crate) negative_mark_value: Option<f64>,
    #[serde(default, alias = "passingScore")]
    pub(crate) passing_score: Option<f64>,
    #[serde(default, alias = "maxAttempts")]
    pub(crate) max_attempts: Option<u32>,
    #[serde(default, alias = "allowRetake")]
    pub(crate) allow_retake: bool,
}

/// Fraction of a question's points deducted for a wrong answer when no explicit value is set.
pub(crate) const DEFAULT_NEGATIVE_MARK_FRACTION: f64 = 0.25;

impl ExamDefinition {
    pub(crate) fn duration_seconds(&self) -> u64 {
        u64::from(self.duration) * 60
    }

    pub(crate) fn total_points(&self) -> f64 {
        self.questions.iter().map(|question| question.points).sum()
    }

    /// Human readable negative marking rule shown on the intro screen.
    pub(crate) fn negative_marking_policy(&self) -> String {
        if !self.negative_marking {
            return "No negative marking: wrong answers cost nothing.".to_string();
        }

        match self.negative_mark_value {
            Some(value) => {
                format!("Negative marking: {value} point(s) deducted per wrong answer.")
            }
            None => format!(
                "Negative marking: {}% of a question's points deducted per wrong answer.",
                DEFAULT_NEGATIVE_MARK_FRACTION * 100.0
            ),
        }
    }
}

fn validate_unique_question_ids(exam: &ExamDefinition) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(exam.questions.len());
    for question in &exam.questions {
        if !seen.insert(question.id.as_str()) {
            let mut error = ValidationError::new("duplicate_question_id");
            error.message = Some(format!("duplicate question id '{}'", question.id).into());
            return Err(error);
        }
    }
    Ok(())
}

fn default_points() -> f64 {
    1.0
}
