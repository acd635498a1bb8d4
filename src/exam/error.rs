// src/exam/error.rs

use thiserror::Error;

use crate::store::StoreError;

/// Failures of the exam core.
///
/// `TimeExpired` is not a hard failure: it tells the caller to switch to the
/// submission path instead of applying the write.
#[derive(Debug, Error)]
pub enum ExamError {
    #[error("No questions match the requested filters")]
    NoMatchingQuestions,

    #[error("Exam session '{0}' not found")]
    SessionNotFound(String),

    #[error("Exam template '{0}' not found")]
    TemplateNotFound(String),

    #[error("The exam has already finished")]
    SessionAlreadyTerminal,

    #[error("The exam has already been submitted")]
    AlreadyCompleted,

    #[error("The exam is still in progress")]
    StillInProgress,

    #[error("The exam time limit has passed")]
    TimeExpired,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Question '{0}' is part of an exam that is still in progress")]
    QuestionInUse(String),

    #[error("Question '{0}' referenced by the session no longer exists")]
    QuestionMissing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
