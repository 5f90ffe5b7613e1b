//! Events that can occur in a session

use super::state::CallKind;
use crate::tutor::{Evaluation, Exercise, Feedback, OptionLabel, QuizQuestion};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User intents
    SelectTopic {
        topic: String,
    },
    CompleteQuiz {
        answers: Vec<OptionLabel>,
    },
    SubmitAnswer {
        answer: String,
        /// Seconds between the exercise being shown and the answer arriving.
        /// `None` lets the runtime fill in its own measurement.
        elapsed_secs: Option<f64>,
    },
    Retry,
    DismissError,

    // Gateway results
    QuizGenerated {
        quiz: Vec<QuizQuestion>,
    },
    QuizEvaluated {
        evaluation: Evaluation,
    },
    ExerciseGenerated {
        exercise: Exercise,
    },
    FeedbackReceived {
        feedback: Feedback,
    },
    GatewayFailed {
        call: CallKind,
        message: String,
    },

    // Timer
    NextExerciseDue {
        ticket: u64,
    },
}

impl Event {
    /// Whether this event originates from the learner rather than the runtime
    pub fn is_user_intent(&self) -> bool {
        matches!(
            self,
            Event::SelectTopic { .. }
                | Event::CompleteQuiz { .. }
                | Event::SubmitAnswer { .. }
                | Event::Retry
                | Event::DismissError
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::SelectTopic { .. } => "select_topic",
            Event::CompleteQuiz { .. } => "complete_quiz",
            Event::SubmitAnswer { .. } => "submit_answer",
            Event::Retry => "retry",
            Event::DismissError => "dismiss_error",
            Event::QuizGenerated { .. } => "quiz_generated",
            Event::QuizEvaluated { .. } => "quiz_evaluated",
            Event::ExerciseGenerated { .. } => "exercise_generated",
            Event::FeedbackReceived { .. } => "feedback_received",
            Event::GatewayFailed { .. } => "gateway_failed",
            Event::NextExerciseDue { .. } => "next_exercise_due",
        }
    }
}
