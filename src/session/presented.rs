use crate::schemas::exam::{Difficulty, ExamDefinition};

/// An option as shown to the student, remembering where it sat in the definition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PresentedOption {
    pub(crate) original_index: usize,
    pub(crate) id: Option<String>,
    pub(crate) text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PresentedQuestion {
    pub(crate) original_position: usize,
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) points: f64,
    pub(crate) difficulty: Option<Difficulty>,
    pub(crate) options: Vec<PresentedOption>,
}

/// Immutable exam content in the order this session displays it.
#[derive(Debug, Clone)]
pub(crate) struct PresentedExam {
    definition: ExamDefinition,
    questions: Vec<PresentedQuestion>,
}

impl PresentedExam {
    /// Keeps the definition order for both questions and options.
    pub(crate) fn in_definition_order(definition: ExamDefinition) -> Self {
        let questions = definition
            .questions
            .iter()
            .enumerate()
            .map(|(position, question)| PresentedQuestion {
                original_position: position,
                id: question.id.clone(),
                text: question.text.clone(),
                points: question.points,
                difficulty: question.difficulty,
                options: question
                    .options
                    .iter()
                    .enumerate()
                    .map(|(index, option)| PresentedOption {
                        original_index: index,
                        id: option.id.clone(),
                        text: option.text.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self { definition, questions }
    }

    pub(crate) fn with_questions(
        definition: ExamDefinition,
        questions: Vec<PresentedQuestion>,
    ) -> Self {
        Self { definition, questions }
    }

    pub(crate) fn definition(&self) -> &ExamDefinition {
        &self.definition
    }

    pub(crate) fn questions(&self) -> &[PresentedQuestion] {
        &self.questions
    }

    pub(crate) fn len(&self) -> usize {
        self.questions.len()
    }

    pub(crate) fn question(&self, position: usize) -> Option<&PresentedQuestion> {
        self.questions.get(position)
    }

    pub(crate) fn position_of(&self, question_id: &str) -> Option<usize> {
        self.questions.iter().position(|question| question.id == question_id)
    }
}
