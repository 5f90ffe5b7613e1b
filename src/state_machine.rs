//! Core tutoring session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{
    CallKind, PendingCall, Phase, Session, SessionContext, SessionError,
    DEFAULT_NEXT_EXERCISE_DELAY,
};
pub use transition::{transition, TransitionError};
#[allow(unused_imports)] // Public API re-exports
pub use transition::TransitionResult;
