//! Effects produced by state transitions

use crate::tutor::{Difficulty, Level, OptionLabel, QuizQuestion};
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the gateway for a diagnostic quiz
    RequestQuiz { topic: String },

    /// Ask the gateway to assess the quiz answers
    RequestEvaluation {
        topic: String,
        quiz: Vec<QuizQuestion>,
        answers: Vec<OptionLabel>,
    },

    /// Ask the gateway for one exercise
    RequestExercise {
        main_topic: String,
        sub_topic: String,
        level: Level,
        difficulty: Difficulty,
    },

    /// Ask the gateway to grade an answer
    RequestFeedback {
        sub_topic: String,
        question: String,
        user_answer: String,
        correct_answer: String,
        time_taken_secs: f64,
    },

    /// Start measuring answer time for the exercise just shown
    StartAnswerClock,

    /// Fire `NextExerciseDue { ticket }` after `delay`, replacing any earlier schedule
    ScheduleNextExercise { delay: Duration, ticket: u64 },

    /// Broadcast the new snapshot to connected clients
    PublishSnapshot,
}

impl Effect {
    pub fn is_gateway_call(&self) -> bool {
        matches!(
            self,
            Effect::RequestQuiz { .. }
                | Effect::RequestEvaluation { .. }
                | Effect::RequestExercise { .. }
                | Effect::RequestFeedback { .. }
        )
    }
}
