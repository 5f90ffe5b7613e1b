//! Session state types

use crate::tutor::{ChatMessage, Exercise, OptionLabel, QuizQuestion, UserProgress};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Screen the learner is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Welcome,
    Quiz,
    Learning,
}

/// Which gateway operation a call or failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Quiz,
    Evaluation,
    Exercise,
    Feedback,
}

impl CallKind {
    /// Message shown to the learner when this call fails
    pub fn failure_message(self) -> &'static str {
        match self {
            CallKind::Quiz => "Failed to generate the quiz. Please try again.",
            CallKind::Evaluation => "Failed to evaluate your quiz. Please try again.",
            CallKind::Exercise => "Failed to fetch the next exercise. Please try again.",
            CallKind::Feedback => "Failed to get feedback. Please try again.",
        }
    }
}

/// A gateway call together with the inputs needed to issue it again
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum PendingCall {
    Quiz { topic: String },
    Evaluation { answers: Vec<OptionLabel> },
    Exercise { sub_topic: String },
    Feedback { answer: String, elapsed_secs: f64 },
}

impl PendingCall {
    pub fn kind(&self) -> CallKind {
        match self {
            PendingCall::Quiz { .. } => CallKind::Quiz,
            PendingCall::Evaluation { .. } => CallKind::Evaluation,
            PendingCall::Exercise { .. } => CallKind::Exercise,
            PendingCall::Feedback { .. } => CallKind::Feedback,
        }
    }
}

/// Error surfaced to the learner after a failed gateway call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionError {
    pub call: CallKind,
    pub message: String,
    /// Underlying gateway error, for diagnostics
    pub detail: String,
}

/// One learner's tutoring session.
///
/// Snapshots handed to the presentation layer are whole clones of this value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Session {
    pub phase: Phase,
    /// Grammar topic chosen on the welcome screen; fixed once the quiz exists
    pub goal_topic: Option<String>,
    pub quiz: Vec<QuizQuestion>,
    pub current_exercise: Option<Exercise>,
    /// Append-only chat history
    pub transcript: Vec<ChatMessage>,
    pub progress: UserProgress,
    pub active_sub_topic: Option<String>,
    /// Gateway call in flight; the session is busy while this is set
    pub pending: Option<PendingCall>,
    pub last_error: Option<SessionError>,
    /// Ticket of the deferred next-exercise fetch, if one is scheduled
    pub scheduled_exercise: Option<u64>,
    /// Last call that failed, kept so it can be retried.
    /// Clients see only its kind, as `retryable`.
    #[serde(rename = "retryable", serialize_with = "serialize_retryable")]
    pub failed_call: Option<PendingCall>,
    #[serde(skip)]
    pub tickets_issued: u64,
}

impl Session {
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn can_retry(&self) -> bool {
        self.failed_call.is_some() && self.pending.is_none()
    }
}

#[allow(clippy::ref_option)] // signature fixed by serde's serialize_with
fn serialize_retryable<S: Serializer>(
    call: &Option<PendingCall>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    call.as_ref().map(PendingCall::kind).serialize(serializer)
}

/// Default pause between feedback and the next exercise
pub const DEFAULT_NEXT_EXERCISE_DELAY: Duration = Duration::from_secs(2);

/// Context for a session (immutable configuration)
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    /// Pause between graded feedback and fetching the next exercise
    pub next_exercise_delay: Duration,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            next_exercise_delay: DEFAULT_NEXT_EXERCISE_DELAY,
        }
    }

    #[must_use]
    pub fn with_next_exercise_delay(mut self, delay: Duration) -> Self {
        self.next_exercise_delay = delay;
        self
    }
}
