//! Prompt text and response schemas for the four tutoring calls
//!
//! Schemas use the OpenAPI subset Gemini accepts in `responseSchema`.

use super::types::{Difficulty, Level, OptionLabel, QuizQuestion};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

/// Number of diagnostic questions requested per quiz
pub const QUIZ_LENGTH: usize = 3;

/// Answer pacing bucket used in feedback prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Fast,
    Medium,
    Slow,
}

impl Pace {
    /// Under 10s is fast, 10 to 20s is medium, over 20s is slow
    pub fn from_secs(secs: f64) -> Self {
        if secs < 10.0 {
            Self::Fast
        } else if secs <= 20.0 {
            Self::Medium
        } else {
            Self::Slow
        }
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
        })
    }
}

// ============================================================================
// Diagnostic quiz
// ============================================================================

pub fn quiz_prompt(topic: &str) -> String {
    format!(
        "You are an English grammar expert writing a diagnostic quiz for an adult learner \
         who wants to focus on {topic}. Write exactly {QUIZ_LENGTH} multiple-choice questions, \
         each with four options labelled a, b, c and d, chosen so the answers reveal whether \
         the learner is at a beginner, intermediate or advanced level. For every question give \
         the letter of the correct option. Respond with JSON only."
    )
}

pub fn quiz_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "options": {
                    "type": "OBJECT",
                    "properties": {
                        "a": { "type": "STRING" },
                        "b": { "type": "STRING" },
                        "c": { "type": "STRING" },
                        "d": { "type": "STRING" }
                    },
                    "required": ["a", "b", "c", "d"]
                },
                "answer": {
                    "type": "STRING",
                    "enum": ["a", "b", "c", "d"],
                    "description": "Letter of the correct option"
                }
            },
            "required": ["question", "options", "answer"]
        }
    })
}

// ============================================================================
// Quiz evaluation
// ============================================================================

/// One graded line of the evaluation payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnsweredQuestion<'a> {
    question: &'a str,
    user_answer: &'a str,
    correct_answer: &'a str,
}

/// Build the evaluation prompt.
///
/// Answers are paired positionally with `quiz`; extra answers are ignored and
/// missing ones are sent as empty strings.
pub fn evaluation_prompt(topic: &str, quiz: &[QuizQuestion], answers: &[OptionLabel]) -> String {
    let graded: Vec<AnsweredQuestion<'_>> = quiz
        .iter()
        .enumerate()
        .map(|(i, q)| AnsweredQuestion {
            question: &q.question,
            user_answer: answers.get(i).map_or("", |a| a.as_str()),
            correct_answer: q.answer.as_str(),
        })
        .collect();
    let payload = serde_json::to_string(&graded).unwrap_or_else(|_| "[]".to_string());

    format!(
        "An adult English learner took a diagnostic quiz on {topic}. These are the questions, \
         the learner's answers and the correct answers: {payload}. Based on this performance, \
         assess the learner's level as Beginner, Intermediate or Advanced, and suggest one \
         specific sub-topic within {topic} to start learning with. Keep the tone professional \
         and encouraging, in English. Respond with JSON only."
    )
}

pub fn evaluation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "level": { "type": "STRING", "enum": ["Beginner", "Intermediate", "Advanced"] },
            "suggestion": {
                "type": "STRING",
                "description": "A specific sub-topic to start with"
            }
        },
        "required": ["level", "suggestion"]
    })
}

// ============================================================================
// Exercise generation
// ============================================================================

pub fn exercise_prompt(
    main_topic: &str,
    sub_topic: &str,
    level: Level,
    difficulty: Difficulty,
) -> String {
    format!(
        "You are an English tutor. The learner is at the {level} level and is working on \
         \"{main_topic}\", currently the sub-topic \"{sub_topic}\". Create one grammar exercise \
         of {difficulty} difficulty. Its type must be either 'multiple-choice' (exactly 4 \
         options, the answer being the text of the correct option) or 'fill-in-the-blank' \
         (the learner types the missing word; mark the gap with \"___\"). Provide the type, the \
         question, the options when multiple-choice, and the correct answer. Respond with JSON \
         only."
    )
}

pub fn exercise_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "type": { "type": "STRING", "enum": ["multiple-choice", "fill-in-the-blank"] },
            "question": { "type": "STRING" },
            "options": { "type": "ARRAY", "items": { "type": "STRING" } },
            "answer": { "type": "STRING" }
        },
        "required": ["type", "question", "answer"]
    })
}

// ============================================================================
// Answer feedback
// ============================================================================

pub fn feedback_prompt(
    sub_topic: &str,
    question: &str,
    user_answer: &str,
    correct_answer: &str,
    time_taken_secs: f64,
) -> String {
    // Bucket the value the learner sees, not the raw measurement
    let shown_secs = (time_taken_secs * 10.0).round() / 10.0;
    let pace = Pace::from_secs(shown_secs);
    format!(
        "An English learner answered an exercise about {sub_topic}.\n\
         - Question: \"{question}\"\n\
         - Their answer: \"{user_answer}\"\n\
         - Correct answer: \"{correct_answer}\"\n\
         - Time taken: {shown_secs:.1} seconds ({pace}).\n\
         Decide whether the answer is correct and report it in isCorrect. Give concise, \
         constructive feedback explaining why the answer is right or wrong. Then, using both \
         correctness and speed (under 10s is fast, 10-20s is medium, over 20s is slow), suggest \
         the next step: a more challenging exercise, a similar one for review, an easier one, \
         or a short grammar explanation. Keep the tone encouraging. Respond with JSON only."
    )
}

pub fn feedback_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isCorrect": {
                "type": "BOOLEAN",
                "description": "Whether the learner's answer is correct"
            },
            "feedback": { "type": "STRING", "description": "Concise, constructive feedback" },
            "nextStepSuggestion": { "type": "STRING", "description": "Suggested next step" }
        },
        "required": ["isCorrect", "feedback", "nextStepSuggestion"]
    })
}
