//! Tutoring value types shared by the gateway, state machine, and API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal marker fill-in-the-blank questions use for the gap
pub const BLANK_MARKER: &str = "___";

// ============================================================================
// Quiz
// ============================================================================

/// Label of one of the four quiz options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::C => "c",
            Self::D => "d",
        }
    }

    /// Parse a label leniently: `"a"`, `"A"`, `" b) "` and `"c."` are accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned = raw
            .trim()
            .trim_end_matches([')', '.', ':'])
            .trim()
            .to_ascii_lowercase();
        match cleaned.as_str() {
            "a" => Some(Self::A),
            "b" => Some(Self::B),
            "c" => Some(Self::C),
            "d" => Some(Self::D),
            _ => None,
        }
    }
}

impl TryFrom<String> for OptionLabel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid option label: {value:?}"))
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four options of a quiz question, keyed `a` through `d`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOptions {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
}

/// One diagnostic quiz question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: QuizOptions,
    pub answer: OptionLabel,
}

// ============================================================================
// Levels and difficulty
// ============================================================================

/// Assessed proficiency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested exercise difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Exercises
// ============================================================================

/// A single practice exercise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Exercise {
    /// Pick one of `options`; `answer` is the text of the correct option
    MultipleChoice {
        question: String,
        options: Vec<String>,
        answer: String,
    },
    /// Type the word(s) that fill the `___` gap in `question`
    FillInTheBlank { question: String, answer: String },
}

impl Exercise {
    pub fn question(&self) -> &str {
        match self {
            Self::MultipleChoice { question, .. } | Self::FillInTheBlank { question, .. } => {
                question
            }
        }
    }

    pub fn answer(&self) -> &str {
        match self {
            Self::MultipleChoice { answer, .. } | Self::FillInTheBlank { answer, .. } => answer,
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            Self::MultipleChoice { options, .. } => Some(options),
            Self::FillInTheBlank { .. } => None,
        }
    }

    pub fn has_blank(&self) -> bool {
        self.question().contains(BLANK_MARKER)
    }
}

// ============================================================================
// Gateway results
// ============================================================================

/// Level assessment returned after the diagnostic quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub level: Level,
    /// Grammar sub-topic to start with
    pub suggestion: String,
}

/// Feedback on a submitted answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub feedback: String,
    pub next_step_suggestion: String,
    /// Explicit verdict; older prompts or sloppy models may omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

// ============================================================================
// Transcript
// ============================================================================

/// Who authored a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
    System,
}

/// One entry of the chat transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            sender,
            text: text.into(),
            suggestion: None,
            sent_at,
        }
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}
