//! API request and response types

use crate::state_machine::Session;
use serde::{Deserialize, Serialize};

/// Grammar topics offered on the welcome screen
#[derive(Debug, Serialize)]
pub struct TopicsResponse {
    pub topics: Vec<&'static str>,
}

/// Response for a newly created session
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub id: String,
    pub session: Session,
}

/// Response with a session snapshot
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: Session,
}

/// Request to pick the learner's goal topic
#[derive(Debug, Deserialize)]
pub struct SelectTopicRequest {
    pub topic: String,
}

/// Request to hand in the diagnostic quiz
#[derive(Debug, Deserialize)]
pub struct CompleteQuizRequest {
    /// One option label per question, in quiz order
    pub answers: Vec<String>,
}

/// Request to submit an exercise answer, typed or transcribed from speech
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub answer: String,
    /// Seconds the learner took; measured server-side when absent
    #[serde(default)]
    pub elapsed_secs: Option<f64>,
}

/// Response for queued intents
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
