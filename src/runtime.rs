//! Runtime for executing tutoring sessions
//!
//! One event loop per session; the manager owns every live session.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::state_machine::{Event, Session, SessionContext};
use crate::tutor::TutorGateway;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<SessionEvent>,
    pub snapshot_rx: watch::Receiver<Session>,
    shutdown: CancellationToken,
    /// Milliseconds since the manager's epoch at the last client request
    last_seen_ms: Arc<AtomicU64>,
}

impl SessionHandle {
    /// Latest published snapshot
    pub fn snapshot(&self) -> Session {
        self.snapshot_rx.borrow().clone()
    }

    /// No open stream and no request for at least `ttl_ms`
    fn is_idle(&self, now_ms: u64, ttl_ms: u64) -> bool {
        self.broadcast_tx.receiver_count() == 0
            && now_ms.saturating_sub(self.last_seen_ms.load(Ordering::Relaxed)) >= ttl_ms
    }
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Snapshot { session: Box<Session> },
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session {0} is shutting down")]
    Closed(String),
}

/// Manager for all session runtimes
pub struct RuntimeManager {
    gateway: Arc<dyn TutorGateway>,
    next_exercise_delay: Duration,
    /// Sessions with no stream and no request for this long are ended
    idle_ttl: Duration,
    epoch: Instant,
    runtimes: RwLock<HashMap<String, SessionHandle>>,
}

impl RuntimeManager {
    pub fn new(
        gateway: Arc<dyn TutorGateway>,
        next_exercise_delay: Duration,
        idle_ttl: Duration,
    ) -> Self {
        Self {
            gateway,
            next_exercise_delay,
            idle_ttl,
            epoch: Instant::now(),
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Start a fresh session on the welcome screen
    pub async fn create(&self) -> (String, Session) {
        let session_id = uuid::Uuid::new_v4().to_string();
        let context = SessionContext::new(&session_id)
            .with_next_exercise_delay(self.next_exercise_delay);
        let session = Session::default();

        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.clone());
        let shutdown = CancellationToken::new();

        let runtime = SessionRuntime::new(
            context,
            session.clone(),
            Arc::clone(&self.gateway),
            event_rx,
            event_tx.clone(),
            broadcast_tx.clone(),
            snapshot_tx,
            shutdown.clone(),
        );

        // Start runtime in background
        let id = session_id.clone();
        tokio::spawn(async move {
            runtime.run().await;
            tracing::info!(session_id = %id, "Session runtime finished");
        });

        self.runtimes.write().await.insert(
            session_id.clone(),
            SessionHandle {
                event_tx,
                broadcast_tx,
                snapshot_rx,
                shutdown,
                last_seen_ms: Arc::new(AtomicU64::new(self.now_ms())),
            },
        );

        tracing::info!(session_id = %session_id, "Session created");
        (session_id, session)
    }

    /// Look a session up; every lookup counts as client activity
    pub async fn get(&self, session_id: &str) -> Result<SessionHandle, RuntimeError> {
        let handle = self
            .runtimes
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(session_id.to_string()))?;
        handle.last_seen_ms.store(self.now_ms(), Ordering::Relaxed);
        Ok(handle)
    }

    /// Current snapshot; reading it never triggers gateway calls
    pub async fn snapshot(&self, session_id: &str) -> Result<Session, RuntimeError> {
        Ok(self.get(session_id).await?.snapshot())
    }

    /// Queue an event for a session
    pub async fn send_event(&self, session_id: &str, event: Event) -> Result<(), RuntimeError> {
        let handle = self.get(session_id).await?;
        handle
            .event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::Closed(session_id.to_string()))
    }

    /// Subscribe to session updates.
    ///
    /// The receiver is created before the snapshot is read so no update
    /// published in between is lost.
    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<(Session, broadcast::Receiver<SessionEvent>), RuntimeError> {
        let handle = self.get(session_id).await?;
        let rx = handle.broadcast_tx.subscribe();
        Ok((handle.snapshot(), rx))
    }

    /// Tear a session down, cancelling any scheduled exercise fetch
    pub async fn end(&self, session_id: &str) -> Result<(), RuntimeError> {
        let handle = self
            .runtimes
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| RuntimeError::NotFound(session_id.to_string()))?;
        handle.shutdown.cancel();
        tracing::info!(session_id = %session_id, "Session ended");
        Ok(())
    }

    /// End every session, used on process shutdown
    pub async fn end_all(&self) {
        let handles: Vec<_> = self.runtimes.write().await.drain().collect();
        for (_, handle) in &handles {
            handle.shutdown.cancel();
        }
        tracing::info!(count = handles.len(), "All sessions ended");
    }

    /// End sessions whose tab is gone: no open stream and no request within the idle TTL
    pub async fn reap_idle(&self) -> usize {
        let now_ms = self.now_ms();
        let ttl_ms = u64::try_from(self.idle_ttl.as_millis()).unwrap_or(u64::MAX);

        let mut runtimes = self.runtimes.write().await;
        let idle: Vec<String> = runtimes
            .iter()
            .filter(|(_, handle)| handle.is_idle(now_ms, ttl_ms))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &idle {
            if let Some(handle) = runtimes.remove(id) {
                handle.shutdown.cancel();
                tracing::info!(session_id = %id, "Idle session ended");
            }
        }
        idle.len()
    }

    /// Sweep for idle sessions every `every` until the manager is dropped
    pub fn spawn_idle_reaper(manager: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let manager = Arc::downgrade(manager);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let reaped = manager.reap_idle().await;
                if reaped > 0 {
                    let remaining = manager.session_count().await;
                    tracing::info!(
                        reaped,
                        remaining,
                        "Idle sweep finished"
                    );
                }
            }
        })
    }

    pub async fn session_count(&self) -> usize {
        self.runtimes.read().await.len()
    }
}
