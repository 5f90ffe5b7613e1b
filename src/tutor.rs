//! Tutoring domain: wire types, AI gateway contracts, and progress tracking

mod gateway;
mod progress;
mod prompts;
mod types;

pub use gateway::{GatewayError, LlmTutorGateway, TutorGateway};
pub use progress::{is_correct, UserProgress};
pub use types::*;

/// Broad grammar topics offered on the welcome screen
pub const GRAMMAR_TOPICS: &[&str] = &[
    "Tenses",
    "Articles (a, an, the)",
    "Prepositions",
    "Conditionals",
    "Modal Verbs",
    "Passive Voice",
    "Reported Speech",
    "Phrasal Verbs",
    "Relative Clauses",
    "Gerunds and Infinitives",
];
