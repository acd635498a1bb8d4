// src/models/session.rs

use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::{Difficulty, QuestionKind};

/// One answer slot of an exam session.
///
/// Single-choice answers travel as a bare index, multiple-choice answers as
/// an array. `-1` and `[]` mean "unanswered".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Choice(i32),
    Choices(Vec<i32>),
}

impl Answer {
    pub const UNANSWERED: Answer = Answer::Choice(-1);

    /// The unanswered sentinel in the shape matching a question type.
    pub fn unanswered_for(kind: QuestionKind) -> Answer {
        match kind {
            QuestionKind::Single => Answer::UNANSWERED,
            QuestionKind::Multiple => Answer::Choices(Vec::new()),
        }
    }

    pub fn is_answered(&self) -> bool {
        match self {
            Answer::Choice(index) => *index >= 0,
            Answer::Choices(indices) => !indices.is_empty(),
        }
    }

    /// The selected option indices as a set. Sentinels and negative entries are dropped.
    pub fn selected(&self) -> BTreeSet<usize> {
        match self {
            Answer::Choice(index) => usize::try_from(*index).into_iter().collect(),
            Answer::Choices(indices) => indices
                .iter()
                .filter_map(|i| usize::try_from(*i).ok())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    /// Kept for storage compatibility with rows that already carry it.
    /// Timed-out sessions are written as `Completed` with `auto_submitted`
    /// set, so nothing here produces it.
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Expired => "expired",
        }
    }

    /// Completed and Expired are terminal; nothing leaves them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "expired" => Ok(SessionStatus::Expired),
            other => Err(format!("unknown session status '{}'", other)),
        }
    }
}

/// Parameters captured at exam start, kept for analytics grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamConfig {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub time_limit_minutes: Option<u32>,
    pub template_id: Option<String>,
}

/// Client auto-save state, read back on resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub current_question_index: usize,
    pub answers: Vec<Answer>,
    pub last_saved_at: DateTime<Utc>,
}

/// One exam attempt by one user.
///
/// Only question ids are stored; question payloads stay in the question store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: String,
    pub user_name: String,
    pub question_ids: Vec<String>,
    /// One slot per entry of `question_ids`.
    pub answers: Vec<Answer>,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub config: ExamConfig,
    /// Percentage in 0..=100, present once the session is terminal.
    pub score: Option<f64>,
    pub progress: Option<ProgressSnapshot>,
    /// Set when completion came from the time limit rather than a submit.
    #[serde(default)]
    pub auto_submitted: bool,
}

/// DTO for starting an exam.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct StartExamRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "User name length must be between 1 and 100 characters."
    ))]
    pub user_name: String,
    pub total_questions: Option<usize>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub time_limit_minutes: Option<u32>,
    pub template_id: Option<String>,
}

/// DTO for the periodic auto-save. Always the full answer vector.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveProgressRequest {
    pub answers: Vec<Answer>,
    pub current_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitExamRequest {
    pub answers: Vec<Answer>,
}
