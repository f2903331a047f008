use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::schemas::exam::ExamDefinition;
use crate::session::presented::PresentedExam;

/// Deterministic presentation order for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShufflePlan {
    seed: u64,
}

impl ShufflePlan {
    /// Uses the given seed, or draws a fresh one.
    pub(crate) fn new(seed: Option<u64>) -> Self {
        Self { seed: seed.unwrap_or_else(rand::random::<u64>) }
    }

    pub(crate) fn seed(&self) -> u64 {
        self.seed
    }

    /// Questions and each question's options are permuted only when the exam asks for it.
    pub(crate) fn present(&self, definition: ExamDefinition) -> PresentedExam {
        let shuffle_questions = definition.shuffle_questions;
        let shuffle_options = definition.shuffle_options;
        let base = PresentedExam::in_definition_order(definition);
        if !shuffle_questions && !shuffle_options {
            return base;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut questions = base.questions().to_vec();
        if shuffle_questions {
            questions.shuffle(&mut rng);
        }
        if shuffle_options {
            for question in &mut questions {
                question.options.shuffle(&mut rng);
            }
        }

        tracing::debug!(
            seed = self.seed,
            shuffle_questions,
            shuffle_options,
            "Shuffled exam presentation"
        );
        PresentedExam::with_questions(base.definition().clone(), questions)
    }
}
