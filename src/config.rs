//! Server configuration read from the environment

use std::time::Duration;

use crate::state_machine::DEFAULT_NEXT_EXERCISE_DELAY;

pub const DEFAULT_PORT: u16 = 8000;

/// Sessions with no open stream and no request for this long are ended
pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Upper bound on the idle sweep period
const MAX_IDLE_SWEEP: Duration = Duration::from_secs(60);

/// Settings for the HTTP server and session runtimes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Pause between feedback and the next exercise request
    pub next_exercise_delay: Duration,
    pub session_idle_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            next_exercise_delay: DEFAULT_NEXT_EXERCISE_DELAY,
            session_idle_ttl: DEFAULT_SESSION_IDLE_TTL,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unparseable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = lookup("TUTOR_PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(defaults.port);

        let next_exercise_delay = lookup("TUTOR_NEXT_EXERCISE_DELAY_MS")
            .and_then(|ms| ms.trim().parse::<u64>().ok())
            .map_or(defaults.next_exercise_delay, Duration::from_millis);

        let session_idle_ttl = lookup("TUTOR_SESSION_IDLE_TTL_SECS")
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(defaults.session_idle_ttl, Duration::from_secs);

        Self {
            port,
            next_exercise_delay,
            session_idle_ttl,
        }
    }

    /// How often to sweep for idle sessions: a quarter of the TTL, at most a minute
    pub fn idle_sweep_interval(&self) -> Duration {
        (self.session_idle_ttl / 4)
            .min(MAX_IDLE_SWEEP)
            .max(Duration::from_millis(1))
    }
}
