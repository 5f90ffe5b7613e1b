//! Running scoreboard for graded answers

use super::types::{Feedback, Level};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correct / total counts for one sub-topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicTally {
    pub correct: u32,
    pub total: u32,
}

/// Cumulative progress of a learner within one session.
///
/// Only ever advanced through [`UserProgress::fold`]; `correct_answers` never
/// exceeds `total_questions` and `average_time` is zero until the first answer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "ProgressSnapshot")]
pub struct UserProgress {
    pub level: Level,
    pub correct_answers: u32,
    pub total_questions: u32,
    /// Running mean of answer latency in seconds
    pub average_time: f64,
    /// Tallies keyed by the sub-topic that was active when the answer was graded
    pub topic_progress: BTreeMap<String, TopicTally>,
}

impl UserProgress {
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Fold one graded answer into the scoreboard
    #[must_use]
    pub fn fold(&self, sub_topic: &str, is_correct: bool, time_taken_secs: f64) -> Self {
        let total_questions = self.total_questions + 1;
        let correct_answers = self.correct_answers + u32::from(is_correct);
        let total_time = self.average_time * f64::from(self.total_questions) + time_taken_secs;

        let mut topic_progress = self.topic_progress.clone();
        let tally = topic_progress.entry(sub_topic.to_string()).or_default();
        tally.total += 1;
        tally.correct += u32::from(is_correct);

        Self {
            level: self.level,
            correct_answers,
            total_questions,
            average_time: total_time / f64::from(total_questions),
            topic_progress,
        }
    }

    /// Percentage of correct answers, 0 when nothing has been answered
    pub fn accuracy(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            f64::from(self.correct_answers) / f64::from(self.total_questions) * 100.0
        }
    }
}

/// Wire form of [`UserProgress`], carrying the derived accuracy percentage
#[derive(Debug, Serialize)]
struct ProgressSnapshot {
    level: Level,
    correct_answers: u32,
    total_questions: u32,
    average_time: f64,
    accuracy: f64,
    topic_progress: BTreeMap<String, TopicTally>,
}

impl From<UserProgress> for ProgressSnapshot {
    fn from(progress: UserProgress) -> Self {
        Self {
            accuracy: progress.accuracy(),
            level: progress.level,
            correct_answers: progress.correct_answers,
            total_questions: progress.total_questions,
            average_time: progress.average_time,
            topic_progress: progress.topic_progress,
        }
    }
}

/// Whether `feedback` judges the answer correct.
///
/// The explicit verdict wins; prose is only consulted when the model left it out.
pub fn is_correct(feedback: &Feedback) -> bool {
    feedback
        .is_correct
        .unwrap_or_else(|| judge_from_prose(&feedback.feedback))
}

const NEGATIVE_CUES: &[&str] = &[
    "incorrect",
    "not correct",
    "not quite correct",
    "not right",
    "not quite right",
    "wrong",
];

/// Prose fallback: negated phrasings are checked before "correct" / "right".
pub fn judge_from_prose(text: &str) -> bool {
    let lower = text.to_lowercase();
    if NEGATIVE_CUES.iter().any(|cue| lower.contains(cue)) {
        return false;
    }
    lower.contains("correct") || lower.contains("right")
}
