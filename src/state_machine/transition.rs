//! Pure state transition function
//!
//! Given the same session, context, event and clock reading, `transition`
//! always produces the same result. Gateway calls, timers and broadcasts are
//! only requested through [`Effect`]s.

use super::{CallKind, Effect, Event, PendingCall, Phase, Session, SessionContext, SessionError};
use crate::tutor::{is_correct, ChatMessage, Difficulty, Evaluation, Sender};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: Session) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A request is already in progress, wait for it to finish")]
    Busy,
    #[error("Retry or dismiss the current error first")]
    ErrorPending,
    #[error("There is no exercise to answer")]
    NoExercise,
    #[error("Expected {expected} quiz answers, got {actual}")]
    AnswerCountMismatch { expected: usize, actual: usize },
    #[error("Next-exercise ticket {0} is no longer scheduled")]
    StaleTicket(u64),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &Session,
    context: &SessionContext,
    event: Event,
    now: DateTime<Utc>,
) -> Result<TransitionResult, TransitionError> {
    if event.is_user_intent() {
        if state.is_busy() {
            return Err(TransitionError::Busy);
        }
        if state.last_error.is_some() && !matches!(event, Event::Retry | Event::DismissError) {
            return Err(TransitionError::ErrorPending);
        }
    }

    match (state.phase, event) {
        // ============================================================
        // Learner intents
        // ============================================================
        (Phase::Welcome, Event::SelectTopic { topic }) => {
            let topic = topic.trim();
            if topic.is_empty() {
                return Err(TransitionError::InvalidTransition(
                    "topic must not be empty".to_string(),
                ));
            }
            issue(
                state.clone(),
                PendingCall::Quiz {
                    topic: topic.to_string(),
                },
            )
        }

        (Phase::Quiz, Event::CompleteQuiz { answers }) => {
            if answers.len() != state.quiz.len() {
                return Err(TransitionError::AnswerCountMismatch {
                    expected: state.quiz.len(),
                    actual: answers.len(),
                });
            }
            issue(state.clone(), PendingCall::Evaluation { answers })
        }

        (Phase::Learning, Event::SubmitAnswer { answer, elapsed_secs }) => {
            if state.current_exercise.is_none() {
                return Err(TransitionError::NoExercise);
            }
            if answer.trim().is_empty() {
                return Err(TransitionError::InvalidTransition(
                    "answer must not be empty".to_string(),
                ));
            }
            let mut next = state.clone();
            next.transcript
                .push(ChatMessage::new(Sender::User, answer.clone(), now));
            issue(
                next,
                PendingCall::Feedback {
                    answer,
                    elapsed_secs: clamp_elapsed(elapsed_secs.unwrap_or_default()),
                },
            )
        }

        (_, Event::Retry) => match state.failed_call.clone() {
            Some(call) if state.can_retry() => {
                let mut next = state.clone();
                next.last_error = None;
                issue(next, call)
            }
            _ => Err(TransitionError::InvalidTransition(
                "nothing to retry".to_string(),
            )),
        },

        // The failed call stays recorded so it can still be retried later
        (_, Event::DismissError) => {
            let mut next = state.clone();
            next.last_error = None;
            Ok(TransitionResult::new(next).with_effect(Effect::PublishSnapshot))
        }

        // ============================================================
        // Gateway results
        // ============================================================
        (_, Event::QuizGenerated { quiz }) => {
            let Some(PendingCall::Quiz { topic }) = &state.pending else {
                return Err(unexpected_result(state, CallKind::Quiz));
            };
            if quiz.is_empty() {
                return Err(TransitionError::InvalidTransition(
                    "quiz has no questions".to_string(),
                ));
            }

            let mut next = state.clone();
            next.transcript.push(ChatMessage::new(
                Sender::System,
                format!("Let's start with a quick quiz on {topic} to understand your level."),
                now,
            ));
            next.goal_topic = Some(topic.clone());
            next.quiz = quiz;
            next.phase = Phase::Quiz;
            next.pending = None;
            Ok(TransitionResult::new(next).with_effect(Effect::PublishSnapshot))
        }

        (_, Event::QuizEvaluated { evaluation }) => {
            if !matches!(state.pending, Some(PendingCall::Evaluation { .. })) {
                return Err(unexpected_result(state, CallKind::Evaluation));
            }
            let topic = goal_topic(state)?.to_string();
            let Evaluation { level, suggestion } = evaluation;

            let mut next = state.clone();
            next.progress = state.progress.clone().with_level(level);
            next.active_sub_topic = Some(suggestion.clone());
            next.transcript
                .push(ChatMessage::new(Sender::User, "I've finished the quiz.", now));
            next.transcript.push(
                ChatMessage::new(
                    Sender::Agent,
                    format!(
                        "Great job on the quiz! It looks like you're at an {level} level for \
                         {topic}. Based on that, I suggest we start with: **{suggestion}**. \
                         Ready to begin?"
                    ),
                    now,
                )
                .with_suggestion(suggestion.clone()),
            );
            next.phase = Phase::Learning;
            next.pending = None;

            // Evaluation completing is the one trigger for the first exercise
            issue(next, PendingCall::Exercise { sub_topic: suggestion })
        }

        (_, Event::ExerciseGenerated { exercise }) => {
            let Some(PendingCall::Exercise { sub_topic }) = &state.pending else {
                return Err(unexpected_result(state, CallKind::Exercise));
            };

            let mut next = state.clone();
            next.transcript.push(ChatMessage::new(
                Sender::Agent,
                format!("Here's an exercise on **{sub_topic}**."),
                now,
            ));
            next.current_exercise = Some(exercise);
            next.pending = None;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::StartAnswerClock)
                .with_effect(Effect::PublishSnapshot))
        }

        (_, Event::FeedbackReceived { feedback }) => {
            let Some(PendingCall::Feedback { elapsed_secs, .. }) = &state.pending else {
                return Err(unexpected_result(state, CallKind::Feedback));
            };
            let sub_topic = active_sub_topic(state)?;
            let correct = is_correct(&feedback);

            let mut next = state.clone();
            next.progress = state.progress.fold(sub_topic, correct, *elapsed_secs);
            next.transcript.push(ChatMessage::new(
                Sender::Agent,
                format!("{}\n\n{}", feedback.feedback, feedback.next_step_suggestion),
                now,
            ));
            next.current_exercise = None;
            next.pending = None;

            let ticket = state.tickets_issued + 1;
            next.tickets_issued = ticket;
            next.scheduled_exercise = Some(ticket);

            Ok(TransitionResult::new(next)
                .with_effect(Effect::ScheduleNextExercise {
                    delay: context.next_exercise_delay,
                    ticket,
                })
                .with_effect(Effect::PublishSnapshot))
        }

        (_, Event::GatewayFailed { call, message }) => {
            if state.pending.as_ref().map(PendingCall::kind) != Some(call) {
                return Err(unexpected_result(state, call));
            }

            let mut next = state.clone();
            next.failed_call = next.pending.take();
            next.last_error = Some(SessionError {
                call,
                message: call.failure_message().to_string(),
                detail: message,
            });
            Ok(TransitionResult::new(next).with_effect(Effect::PublishSnapshot))
        }

        // ============================================================
        // Deferred next exercise
        // ============================================================
        (Phase::Learning, Event::NextExerciseDue { ticket })
            if state.scheduled_exercise == Some(ticket)
                && state.current_exercise.is_none()
                && !state.is_busy() =>
        {
            let sub_topic = active_sub_topic(state)?.to_string();
            let mut next = state.clone();
            next.scheduled_exercise = None;
            issue(next, PendingCall::Exercise { sub_topic })
        }

        (_, Event::NextExerciseDue { ticket }) => Err(TransitionError::StaleTicket(ticket)),

        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "{} is not allowed in the {phase:?} phase",
            event.name()
        ))),
    }
}

/// Mark `call` in flight on `next` and emit the matching gateway request
fn issue(mut next: Session, call: PendingCall) -> Result<TransitionResult, TransitionError> {
    let request = request_for(&next, &call)?;
    next.pending = Some(call);
    next.failed_call = None;
    Ok(TransitionResult::new(next)
        .with_effect(request)
        .with_effect(Effect::PublishSnapshot))
}

fn request_for(state: &Session, call: &PendingCall) -> Result<Effect, TransitionError> {
    Ok(match call {
        PendingCall::Quiz { topic } => Effect::RequestQuiz {
            topic: topic.clone(),
        },
        PendingCall::Evaluation { answers } => Effect::RequestEvaluation {
            topic: goal_topic(state)?.to_string(),
            quiz: state.quiz.clone(),
            answers: answers.clone(),
        },
        PendingCall::Exercise { sub_topic } => Effect::RequestExercise {
            main_topic: goal_topic(state)?.to_string(),
            sub_topic: sub_topic.clone(),
            level: state.progress.level,
            difficulty: Difficulty::default(),
        },
        PendingCall::Feedback {
            answer,
            elapsed_secs,
        } => {
            let exercise = state
                .current_exercise
                .as_ref()
                .ok_or(TransitionError::NoExercise)?;
            Effect::RequestFeedback {
                sub_topic: active_sub_topic(state)?.to_string(),
                question: exercise.question().to_string(),
                user_answer: answer.clone(),
                correct_answer: exercise.answer().to_string(),
                time_taken_secs: *elapsed_secs,
            }
        }
    })
}

fn goal_topic(state: &Session) -> Result<&str, TransitionError> {
    state
        .goal_topic
        .as_deref()
        .ok_or_else(|| TransitionError::InvalidTransition("no topic selected".to_string()))
}

fn active_sub_topic(state: &Session) -> Result<&str, TransitionError> {
    state
        .active_sub_topic
        .as_deref()
        .ok_or_else(|| TransitionError::InvalidTransition("no active sub-topic".to_string()))
}

fn unexpected_result(state: &Session, call: CallKind) -> TransitionError {
    TransitionError::InvalidTransition(format!(
        "{call:?} result while {:?} is pending",
        state.pending.as_ref().map(PendingCall::kind)
    ))
}

fn clamp_elapsed(secs: f64) -> f64 {
    if secs.is_finite() && secs > 0.0 {
        secs
    } else {
        0.0
    }
}
