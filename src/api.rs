//! HTTP API for the tutoring service
//!
//! The presentation layer drives sessions through intents and follows them
//! through snapshots streamed over SSE.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::RuntimeManager;
use crate::tutor::TutorGateway;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn TutorGateway>,
        next_exercise_delay: Duration,
        session_idle_ttl: Duration,
    ) -> Self {
        Self {
            runtime: Arc::new(RuntimeManager::new(
                gateway,
                next_exercise_delay,
                session_idle_ttl,
            )),
        }
    }
}
