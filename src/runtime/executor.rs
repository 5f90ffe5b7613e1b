//! Session runtime executor

use super::SessionEvent;
use crate::state_machine::{
    transition, CallKind, Effect, Event, Session, SessionContext, TransitionError,
};
use crate::tutor::{GatewayError, TutorGateway};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Runtime that drives one tutoring session against any gateway implementation
pub struct SessionRuntime<G>
where
    G: TutorGateway + ?Sized + 'static,
{
    context: SessionContext,
    state: Session,
    gateway: Arc<G>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<Session>,
    /// Cancelled when the session ends; parent of every timer token
    shutdown: CancellationToken,
    /// Token for the currently scheduled next-exercise timer
    timer_token: Option<CancellationToken>,
    /// When the current exercise was shown
    answer_clock: Option<Instant>,
}

impl<G> SessionRuntime<G>
where
    G: TutorGateway + ?Sized + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: SessionContext,
        state: Session,
        gateway: Arc<G>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
        snapshot_tx: watch::Sender<Session>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            context,
            state,
            gateway,
            event_rx,
            event_tx,
            broadcast_tx,
            snapshot_tx,
            shutdown,
            timer_token: None,
            answer_clock: None,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting session runtime");

        // Process events in a loop - no recursion
        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                Some(event) = self.event_rx.recv() => {
                    self.process_event(event);
                }

                else => break,
            }
        }

        if let Some(token) = self.timer_token.take() {
            token.cancel();
        }
        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let event = self.stamp_elapsed(event);
        let name = event.name();
        let from_user = event.is_user_intent();

        let result = match transition(&self.state, &self.context, event, Utc::now()) {
            Ok(r) => r,
            Err(TransitionError::StaleTicket(ticket)) => {
                tracing::debug!(session_id = %self.context.session_id, ticket, "Ignoring stale next-exercise timer");
                return;
            }
            Err(e) if from_user => {
                // Rejected intents are reported to the learner, the session carries on
                tracing::info!(session_id = %self.context.session_id, event = name, error = %e, "Intent rejected");
                let _ = self.broadcast_tx.send(SessionEvent::Error {
                    message: e.to_string(),
                });
                return;
            }
            Err(e) => {
                tracing::warn!(session_id = %self.context.session_id, event = name, error = %e, "Dropping unexpected event");
                return;
            }
        };

        tracing::debug!(
            session_id = %self.context.session_id,
            event = name,
            phase = ?result.new_state.phase,
            effects = result.effects.len(),
            gateway_calls = result.effects.iter().filter(|e| e.is_gateway_call()).count(),
            "Transition applied"
        );
        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    /// Fill in the answer time from the runtime's own clock when the client sent none
    fn stamp_elapsed(&self, event: Event) -> Event {
        match event {
            Event::SubmitAnswer {
                answer,
                elapsed_secs: None,
            } => Event::SubmitAnswer {
                answer,
                elapsed_secs: Some(
                    self.answer_clock
                        .map_or(0.0, |shown| shown.elapsed().as_secs_f64()),
                ),
            },
            other => other,
        }
    }

    /// Execute an effect
    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RequestQuiz { topic } => {
                let gateway = Arc::clone(&self.gateway);
                self.spawn_call(CallKind::Quiz, async move {
                    gateway
                        .generate_diagnostic_quiz(&topic)
                        .await
                        .map(|quiz| Event::QuizGenerated { quiz })
                });
            }

            Effect::RequestEvaluation {
                topic,
                quiz,
                answers,
            } => {
                let gateway = Arc::clone(&self.gateway);
                self.spawn_call(CallKind::Evaluation, async move {
                    gateway
                        .evaluate_quiz(&topic, &quiz, &answers)
                        .await
                        .map(|evaluation| Event::QuizEvaluated { evaluation })
                });
            }

            Effect::RequestExercise {
                main_topic,
                sub_topic,
                level,
                difficulty,
            } => {
                let gateway = Arc::clone(&self.gateway);
                self.spawn_call(CallKind::Exercise, async move {
                    gateway
                        .generate_exercise(&main_topic, &sub_topic, level, difficulty)
                        .await
                        .map(|exercise| Event::ExerciseGenerated { exercise })
                });
            }

            Effect::RequestFeedback {
                sub_topic,
                question,
                user_answer,
                correct_answer,
                time_taken_secs,
            } => {
                let gateway = Arc::clone(&self.gateway);
                self.spawn_call(CallKind::Feedback, async move {
                    gateway
                        .provide_feedback(
                            &sub_topic,
                            &question,
                            &user_answer,
                            &correct_answer,
                            time_taken_secs,
                        )
                        .await
                        .map(|feedback| Event::FeedbackReceived { feedback })
                });
            }

            Effect::StartAnswerClock => {
                self.answer_clock = Some(Instant::now());
            }

            Effect::ScheduleNextExercise { delay, ticket } => {
                if let Some(previous) = self.timer_token.take() {
                    previous.cancel();
                }
                let token = self.shutdown.child_token();
                self.timer_token = Some(token.clone());

                let event_tx = self.event_tx.clone();
                let session_id = self.context.session_id.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        biased;

                        () = token.cancelled() => {
                            tracing::debug!(session_id = %session_id, ticket, "Next-exercise timer cancelled");
                        }

                        () = tokio::time::sleep(delay) => {
                            let _ = event_tx.send(Event::NextExerciseDue { ticket }).await;
                        }
                    }
                });
            }

            Effect::PublishSnapshot => {
                self.snapshot_tx.send_replace(self.state.clone());
                let _ = self.broadcast_tx.send(SessionEvent::Snapshot {
                    session: Box::new(self.state.clone()),
                });
            }
        }
    }

    /// Run a gateway call in the background.
    ///
    /// The task always reports back with exactly one event: the success event
    /// produced by `call`, or `GatewayFailed`.
    fn spawn_call<F>(&self, kind: CallKind, call: F)
    where
        F: Future<Output = Result<Event, GatewayError>> + Send + 'static,
    {
        let event_tx = self.event_tx.clone();
        let session_id = self.context.session_id.clone();

        tokio::spawn(async move {
            tracing::info!(session_id = %session_id, call = ?kind, "Making gateway call (background)");
            let event = match call.await {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(session_id = %session_id, call = ?kind, error = %e, "Gateway call failed");
                    Event::GatewayFailed {
                        call: kind,
                        message: e.to_string(),
                    }
                }
            };
            let _ = event_tx.send(event).await;
        });
    }
}
