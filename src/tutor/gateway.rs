//! AI gateway: the four structured calls the tutor makes to the model
//!
//! Each call is at-most-once with no retry and no caching. The model's
//! judgment is trusted; only the response shape is checked.

use super::prompts;
use super::types::{Difficulty, Evaluation, Exercise, Feedback, Level, OptionLabel, QuizQuestion};
use crate::llm::{LlmError, LlmRequest, LlmService};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Failure of a gateway call
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Transport or provider failure
    #[error(transparent)]
    Llm(#[from] LlmError),
    /// The response was not JSON of the expected shape
    #[error("response did not match the expected shape: {0}")]
    Schema(String),
}

/// Boundary to the generative model used by the session runtime
#[async_trait]
pub trait TutorGateway: Send + Sync {
    /// Diagnostic quiz of [`prompts::QUIZ_LENGTH`] four-option questions on `topic`
    async fn generate_diagnostic_quiz(&self, topic: &str)
        -> Result<Vec<QuizQuestion>, GatewayError>;

    /// Assess the level from the quiz answers.
    ///
    /// `user_answers` must be positionally aligned with `quiz` and of the same
    /// length; this is a caller precondition and is not checked here.
    async fn evaluate_quiz(
        &self,
        topic: &str,
        quiz: &[QuizQuestion],
        user_answers: &[OptionLabel],
    ) -> Result<Evaluation, GatewayError>;

    async fn generate_exercise(
        &self,
        main_topic: &str,
        sub_topic: &str,
        level: Level,
        difficulty: Difficulty,
    ) -> Result<Exercise, GatewayError>;

    async fn provide_feedback(
        &self,
        sub_topic: &str,
        question: &str,
        user_answer: &str,
        correct_answer: &str,
        time_taken_secs: f64,
    ) -> Result<Feedback, GatewayError>;
}

#[async_trait]
impl<T: TutorGateway + ?Sized> TutorGateway for Arc<T> {
    async fn generate_diagnostic_quiz(
        &self,
        topic: &str,
    ) -> Result<Vec<QuizQuestion>, GatewayError> {
        (**self).generate_diagnostic_quiz(topic).await
    }

    async fn evaluate_quiz(
        &self,
        topic: &str,
        quiz: &[QuizQuestion],
        user_answers: &[OptionLabel],
    ) -> Result<Evaluation, GatewayError> {
        (**self).evaluate_quiz(topic, quiz, user_answers).await
    }

    async fn generate_exercise(
        &self,
        main_topic: &str,
        sub_topic: &str,
        level: Level,
        difficulty: Difficulty,
    ) -> Result<Exercise, GatewayError> {
        (**self)
            .generate_exercise(main_topic, sub_topic, level, difficulty)
            .await
    }

    async fn provide_feedback(
        &self,
        sub_topic: &str,
        question: &str,
        user_answer: &str,
        correct_answer: &str,
        time_taken_secs: f64,
    ) -> Result<Feedback, GatewayError> {
        (**self)
            .provide_feedback(sub_topic, question, user_answer, correct_answer, time_taken_secs)
            .await
    }
}

/// Gateway backed by any [`LlmService`] with structured JSON output
pub struct LlmTutorGateway {
    llm: Arc<dyn LlmService>,
}

impl LlmTutorGateway {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        prompt: String,
        schema: Value,
    ) -> Result<T, GatewayError> {
        let response = self.llm.complete(&LlmRequest::json(prompt, schema)).await?;
        serde_json::from_str(response.json_body()).map_err(|e| {
            tracing::warn!(operation, error = %e, "Model response failed schema parsing");
            GatewayError::Schema(format!("{operation}: {e}"))
        })
    }
}

#[async_trait]
impl TutorGateway for LlmTutorGateway {
    async fn generate_diagnostic_quiz(
        &self,
        topic: &str,
    ) -> Result<Vec<QuizQuestion>, GatewayError> {
        let quiz: Vec<QuizQuestion> = self
            .call("quiz", prompts::quiz_prompt(topic), prompts::quiz_schema())
            .await?;

        if quiz.is_empty() {
            return Err(GatewayError::Schema("quiz: no questions".to_string()));
        }
        if quiz.len() != prompts::QUIZ_LENGTH {
            tracing::warn!(
                expected = prompts::QUIZ_LENGTH,
                actual = quiz.len(),
                "Quiz length differs from request"
            );
        }
        Ok(quiz)
    }

    async fn evaluate_quiz(
        &self,
        topic: &str,
        quiz: &[QuizQuestion],
        user_answers: &[OptionLabel],
    ) -> Result<Evaluation, GatewayError> {
        let evaluation: Evaluation = self
            .call(
                "evaluation",
                prompts::evaluation_prompt(topic, quiz, user_answers),
                prompts::evaluation_schema(),
            )
            .await?;

        if evaluation.suggestion.trim().is_empty() {
            return Err(GatewayError::Schema(
                "evaluation: empty sub-topic suggestion".to_string(),
            ));
        }
        Ok(evaluation)
    }

    async fn generate_exercise(
        &self,
        main_topic: &str,
        sub_topic: &str,
        level: Level,
        difficulty: Difficulty,
    ) -> Result<Exercise, GatewayError> {
        let exercise: Exercise = self
            .call(
                "exercise",
                prompts::exercise_prompt(main_topic, sub_topic, level, difficulty),
                prompts::exercise_schema(),
            )
            .await?;

        if exercise.options().is_some_and(<[String]>::is_empty) {
            return Err(GatewayError::Schema(
                "exercise: multiple-choice without options".to_string(),
            ));
        }
        if matches!(exercise, Exercise::FillInTheBlank { .. }) && !exercise.has_blank() {
            tracing::warn!(sub_topic, "Fill-in-the-blank exercise has no gap marker");
        }
        Ok(exercise)
    }

    async fn provide_feedback(
        &self,
        sub_topic: &str,
        question: &str,
        user_answer: &str,
        correct_answer: &str,
        time_taken_secs: f64,
    ) -> Result<Feedback, GatewayError> {
        self.call(
            "feedback",
            prompts::feedback_prompt(
                sub_topic,
                question,
                user_answer,
                correct_answer,
                time_taken_secs,
            ),
            prompts::feedback_schema(),
        )
        .await
    }
}
