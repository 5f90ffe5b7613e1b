//! Mock implementations for testing
//!
//! These mocks enable integration testing of session runtimes without a model.

use crate::llm::LlmError;
use crate::tutor::{
    Difficulty, Evaluation, Exercise, Feedback, GatewayError, Level, OptionLabel, QuizQuestion,
    TutorGateway,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock Gateway
// ============================================================================

/// A call the mock gateway received, with its inputs
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Quiz {
        topic: String,
    },
    Evaluation {
        topic: String,
        answers: Vec<OptionLabel>,
    },
    Exercise {
        main_topic: String,
        sub_topic: String,
        level: Level,
        difficulty: Difficulty,
    },
    Feedback {
        sub_topic: String,
        user_answer: String,
        correct_answer: String,
        time_taken_secs: f64,
    },
}

/// Gateway that returns queued results, one queue per operation
#[derive(Default)]
pub struct MockGateway {
    quizzes: Mutex<VecDeque<Result<Vec<QuizQuestion>, GatewayError>>>,
    evaluations: Mutex<VecDeque<Result<Evaluation, GatewayError>>>,
    exercises: Mutex<VecDeque<Result<Exercise, GatewayError>>>,
    feedback: Mutex<VecDeque<Result<Feedback, GatewayError>>>,
    /// Delay applied before every answer
    delay: Option<Duration>,
    /// Record of all calls made
    pub calls: Mutex<Vec<GatewayCall>>,
}

fn nothing_queued() -> GatewayError {
    GatewayError::Llm(LlmError::network("No mock response queued"))
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every answer back by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_quiz(&self, result: Result<Vec<QuizQuestion>, GatewayError>) {
        self.quizzes.lock().unwrap().push_back(result);
    }

    pub fn queue_evaluation(&self, result: Result<Evaluation, GatewayError>) {
        self.evaluations.lock().unwrap().push_back(result);
    }

    pub fn queue_exercise(&self, result: Result<Exercise, GatewayError>) {
        self.exercises.lock().unwrap().push_back(result);
    }

    pub fn queue_feedback(&self, result: Result<Feedback, GatewayError>) {
        self.feedback.lock().unwrap().push_back(result);
    }

    /// Get recorded calls
    pub fn recorded_calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn exercise_calls(&self) -> usize {
        self.recorded_calls()
            .iter()
            .filter(|c| matches!(c, GatewayCall::Exercise { .. }))
            .count()
    }

    async fn answer<T>(
        &self,
        call: GatewayCall,
        queue: &Mutex<VecDeque<Result<T, GatewayError>>>,
    ) -> Result<T, GatewayError> {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(nothing_queued()))
    }
}

#[async_trait]
impl TutorGateway for MockGateway {
    async fn generate_diagnostic_quiz(
        &self,
        topic: &str,
    ) -> Result<Vec<QuizQuestion>, GatewayError> {
        let call = GatewayCall::Quiz {
            topic: topic.to_string(),
        };
        self.answer(call, &self.quizzes).await
    }

    async fn evaluate_quiz(
        &self,
        topic: &str,
        _quiz: &[QuizQuestion],
        user_answers: &[OptionLabel],
    ) -> Result<Evaluation, GatewayError> {
        let call = GatewayCall::Evaluation {
            topic: topic.to_string(),
            answers: user_answers.to_vec(),
        };
        self.answer(call, &self.evaluations).await
    }

    async fn generate_exercise(
        &self,
        main_topic: &str,
        sub_topic: &str,
        level: Level,
        difficulty: Difficulty,
    ) -> Result<Exercise, GatewayError> {
        let call = GatewayCall::Exercise {
            main_topic: main_topic.to_string(),
            sub_topic: sub_topic.to_string(),
            level,
            difficulty,
        };
        self.answer(call, &self.exercises).await
    }

    async fn provide_feedback(
        &self,
        sub_topic: &str,
        _question: &str,
        user_answer: &str,
        correct_answer: &str,
        time_taken_secs: f64,
    ) -> Result<Feedback, GatewayError> {
        let call = GatewayCall::Feedback {
            sub_topic: sub_topic.to_string(),
            user_answer: user_answer.to_string(),
            correct_answer: correct_answer.to_string(),
            time_taken_secs,
        };
        self.answer(call, &self.feedback).await
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn sample_quiz() -> Vec<QuizQuestion> {
    serde_json::from_value(serde_json::json!([
        {"question": "I ___ here since 2010.", "options": {"a": "live", "b": "have lived", "c": "lived", "d": "am living"}, "answer": "b"},
        {"question": "She ___ TV right now.", "options": {"a": "watches", "b": "watched", "c": "is watching", "d": "watch"}, "answer": "c"},
        {"question": "By noon they ___.", "options": {"a": "had left", "b": "leave", "c": "leaves", "d": "leaving"}, "answer": "a"}
    ]))
    .unwrap()
}

pub fn sample_exercise() -> Exercise {
    Exercise::FillInTheBlank {
        question: "Yesterday I ___ to the store.".to_string(),
        answer: "went".to_string(),
    }
}

pub fn sample_evaluation() -> Evaluation {
    Evaluation {
        level: Level::Intermediate,
        suggestion: "Present Perfect".to_string(),
    }
}

pub fn correct_feedback() -> Feedback {
    Feedback {
        feedback: "Correct! Well done.".to_string(),
        next_step_suggestion: "Let's try a harder one.".to_string(),
        is_correct: Some(true),
    }
}

// ============================================================================
// Test Runtime Builder
// ============================================================================

use crate::runtime::{SessionEvent, SessionRuntime};
use crate::state_machine::{Event, Session, SessionContext};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// How long tests wait for the runtime before giving up
const WAIT: Duration = Duration::from_secs(2);

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_rx: broadcast::Receiver<SessionEvent>,
    pub snapshot_rx: watch::Receiver<Session>,
    pub gateway: Arc<MockGateway>,
    pub shutdown: CancellationToken,
    _runtime_handle: tokio::task::JoinHandle<()>,
}

impl TestRuntime {
    /// Start a runtime on a fresh session
    pub fn start(gateway: MockGateway, next_exercise_delay: Duration) -> Self {
        Self::start_with(gateway, next_exercise_delay, Session::default())
    }

    pub fn start_with(gateway: MockGateway, next_exercise_delay: Duration, session: Session) -> Self {
        let gateway = Arc::new(gateway);
        let context =
            SessionContext::new("test-session").with_next_exercise_delay(next_exercise_delay);
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(128);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.clone());
        let shutdown = CancellationToken::new();

        let runtime = SessionRuntime::new(
            context,
            session,
            Arc::clone(&gateway),
            event_rx,
            event_tx.clone(),
            broadcast_tx,
            snapshot_tx,
            shutdown.clone(),
        );
        let handle = tokio::spawn(runtime.run());

        Self {
            event_tx,
            broadcast_rx,
            snapshot_rx,
            gateway,
            shutdown,
            _runtime_handle: handle,
        }
    }

    pub async fn send(&self, event: Event) {
        self.event_tx.send(event).await.unwrap();
    }

    /// Wait until a published snapshot satisfies `pred`
    pub async fn wait_for(&mut self, pred: impl FnMut(&Session) -> bool) -> Session {
        tokio::time::timeout(WAIT, self.snapshot_rx.wait_for(pred))
            .await
            .expect("timed out waiting for snapshot")
            .expect("runtime dropped its snapshot channel")
            .clone()
    }

    /// Wait for the next error event, skipping snapshots
    pub async fn next_error(&mut self) -> String {
        tokio::time::timeout(WAIT, async {
            loop {
                match self.broadcast_rx.recv().await {
                    Ok(SessionEvent::Error { message }) => return message,
                    Ok(SessionEvent::Snapshot { .. }) => {}
                    Err(e) => panic!("broadcast closed: {e}"),
                }
            }
        })
        .await
        .expect("timed out waiting for error event")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{CallKind, Phase};
    use crate::tutor::Sender;

    const FAST: Duration = Duration::from_millis(5);

    /// Drive a runtime to the first exercise of the Learning phase
    async fn into_learning(gateway: MockGateway, delay: Duration) -> (TestRuntime, Session) {
        gateway.queue_quiz(Ok(sample_quiz()));
        gateway.queue_evaluation(Ok(sample_evaluation()));
        gateway.queue_exercise(Ok(sample_exercise()));

        let mut rt = TestRuntime::start(gateway, delay);
        rt.send(Event::SelectTopic {
            topic: "Tenses".to_string(),
        })
        .await;
        rt.wait_for(|s| s.phase == Phase::Quiz).await;

        rt.send(Event::CompleteQuiz {
            answers: vec![OptionLabel::B, OptionLabel::A, OptionLabel::A],
        })
        .await;
        let session = rt
            .wait_for(|s| s.current_exercise.is_some() && !s.is_busy())
            .await;
        (rt, session)
    }

    #[tokio::test]
    async fn test_mock_gateway_queues() {
        let mock = MockGateway::new();
        mock.queue_quiz(Ok(sample_quiz()));

        assert_eq!(mock.generate_diagnostic_quiz("Tenses").await.unwrap().len(), 3);
        // Second call should fail (no more responses)
        assert!(mock.generate_diagnostic_quiz("Tenses").await.is_err());
        assert_eq!(mock.recorded_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_quiz_to_learning_flow() {
        let (rt, session) = into_learning(MockGateway::new(), FAST).await;

        assert_eq!(session.phase, Phase::Learning);
        assert_eq!(session.goal_topic.as_deref(), Some("Tenses"));
        assert_eq!(session.progress.level, Level::Intermediate);
        assert_eq!(session.active_sub_topic.as_deref(), Some("Present Perfect"));

        let senders: Vec<_> = session.transcript.iter().map(|m| m.sender).collect();
        assert_eq!(
            senders,
            [Sender::System, Sender::User, Sender::Agent, Sender::Agent]
        );
        assert_eq!(
            session.transcript[3].text,
            "Here's an exercise on **Present Perfect**."
        );

        let calls = rt.gateway.recorded_calls();
        assert_eq!(
            calls[1],
            GatewayCall::Evaluation {
                topic: "Tenses".to_string(),
                answers: vec![OptionLabel::B, OptionLabel::A, OptionLabel::A],
            }
        );
        assert_eq!(
            calls[2],
            GatewayCall::Exercise {
                main_topic: "Tenses".to_string(),
                sub_topic: "Present Perfect".to_string(),
                level: Level::Intermediate,
                difficulty: Difficulty::Medium,
            }
        );
        assert_eq!(rt.gateway.exercise_calls(), 1);
    }

    #[tokio::test]
    async fn test_feedback_then_next_exercise() {
        let gateway = MockGateway::new();
        gateway.queue_feedback(Ok(correct_feedback()));
        let (mut rt, _) = into_learning(gateway, FAST).await;
        rt.gateway.queue_exercise(Ok(sample_exercise()));

        rt.send(Event::SubmitAnswer {
            answer: "went".to_string(),
            elapsed_secs: Some(6.2),
        })
        .await;

        let session = rt
            .wait_for(|s| s.progress.total_questions == 1 && s.current_exercise.is_some())
            .await;
        assert_eq!(session.progress.correct_answers, 1);
        assert!((session.progress.average_time - 6.2).abs() < 1e-9);
        assert_eq!(session.scheduled_exercise, None);
        assert_eq!(rt.gateway.exercise_calls(), 2);

        let feedback_call = rt
            .gateway
            .recorded_calls()
            .into_iter()
            .find(|c| matches!(c, GatewayCall::Feedback { .. }))
            .unwrap();
        assert_eq!(
            feedback_call,
            GatewayCall::Feedback {
                sub_topic: "Present Perfect".to_string(),
                user_answer: "went".to_string(),
                correct_answer: "went".to_string(),
                time_taken_secs: 6.2,
            }
        );
    }

    #[tokio::test]
    async fn test_elapsed_measured_when_client_omits_it() {
        let gateway = MockGateway::new();
        gateway.queue_feedback(Ok(correct_feedback()));
        let (mut rt, _) = into_learning(gateway, Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        rt.send(Event::SubmitAnswer {
            answer: "went".to_string(),
            elapsed_secs: None,
        })
        .await;
        let session = rt.wait_for(|s| s.progress.total_questions == 1).await;

        assert!(session.progress.average_time >= 0.02);
        assert!(session.progress.average_time < 2.0);
    }

    #[tokio::test]
    async fn test_exercise_failure_then_retry() {
        let gateway = MockGateway::new();
        gateway.queue_quiz(Ok(sample_quiz()));
        gateway.queue_evaluation(Ok(sample_evaluation()));
        gateway.queue_exercise(Err(GatewayError::Schema("exercise: bad".to_string())));
        gateway.queue_exercise(Ok(sample_exercise()));

        let mut rt = TestRuntime::start(gateway, FAST);
        rt.send(Event::SelectTopic {
            topic: "Tenses".to_string(),
        })
        .await;
        rt.wait_for(|s| s.phase == Phase::Quiz).await;
        rt.send(Event::CompleteQuiz {
            answers: vec![OptionLabel::B, OptionLabel::C, OptionLabel::A],
        })
        .await;

        let failed = rt.wait_for(|s| s.last_error.is_some()).await;
        let error = failed.last_error.unwrap();
        assert_eq!(error.call, CallKind::Exercise);
        assert_eq!(error.message, "Failed to fetch the next exercise. Please try again.");
        assert_eq!(failed.phase, Phase::Learning);
        assert_eq!(failed.current_exercise, None);

        rt.send(Event::Retry).await;
        let session = rt.wait_for(|s| s.current_exercise.is_some()).await;
        assert_eq!(session.last_error, None);
        assert_eq!(rt.gateway.exercise_calls(), 2);
    }

    #[tokio::test]
    async fn test_busy_intent_reported_as_error() {
        let gateway = MockGateway::new().with_delay(Duration::from_millis(100));
        gateway.queue_quiz(Ok(sample_quiz()));
        let mut rt = TestRuntime::start(gateway, FAST);

        rt.send(Event::SelectTopic {
            topic: "Tenses".to_string(),
        })
        .await;
        rt.send(Event::SelectTopic {
            topic: "Articles (a, an, the)".to_string(),
        })
        .await;

        let message = rt.next_error().await;
        assert!(message.contains("already in progress"));

        let session = rt.wait_for(|s| s.phase == Phase::Quiz).await;
        assert_eq!(session.goal_topic.as_deref(), Some("Tenses"));
        assert_eq!(rt.gateway.recorded_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_scheduled_exercise() {
        let gateway = MockGateway::new();
        gateway.queue_feedback(Ok(correct_feedback()));
        let (mut rt, _) = into_learning(gateway, Duration::from_millis(50)).await;

        rt.send(Event::SubmitAnswer {
            answer: "went".to_string(),
            elapsed_secs: Some(1.0),
        })
        .await;
        rt.wait_for(|s| s.scheduled_exercise.is_some()).await;
        rt.shutdown.cancel();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(rt.gateway.exercise_calls(), 1);
    }

    #[tokio::test]
    async fn test_feedback_failure_keeps_exercise_for_retry() {
        let gateway = MockGateway::new();
        gateway.queue_feedback(Err(GatewayError::Llm(LlmError::server_error("503"))));
        gateway.queue_feedback(Ok(correct_feedback()));
        let (mut rt, _) = into_learning(gateway, Duration::from_secs(60)).await;

        rt.send(Event::SubmitAnswer {
            answer: "went".to_string(),
            elapsed_secs: Some(4.0),
        })
        .await;
        let failed = rt.wait_for(|s| s.last_error.is_some()).await;
        assert_eq!(failed.current_exercise, Some(sample_exercise()));
        assert_eq!(failed.scheduled_exercise, None);
        assert_eq!(failed.transcript.last().unwrap().text, "went");

        rt.send(Event::Retry).await;
        let session = rt.wait_for(|s| s.progress.total_questions == 1).await;
        assert_eq!(session.progress.correct_answers, 1);
        // The answer is recorded once even though grading ran twice
        let answers = session.transcript.iter().filter(|m| m.text == "went").count();
        assert_eq!(answers, 1);
    }
}
