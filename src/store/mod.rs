// src/store/mod.rs

//! Persistence seams of the exam core.
//!
//! The core only talks to these traits. `memory` keeps everything in process
//! (tests and database-less runs), `postgres` is the production backend.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    question::{Question, QuestionFilter},
    session::ExamSession,
    template::ExamTemplate,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be decoded into its record type.
    #[error("Corrupt record '{id}': {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Duplicate id '{0}'")]
    Duplicate(String),
}

#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<Question>, StoreError>;

    /// Fetches the questions with the given ids. Missing ids are skipped; order is unspecified.
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Question>, StoreError>;

    /// Uniform random selection without replacement of up to `count` matching questions.
    async fn sample(&self, count: usize, filter: &QuestionFilter)
    -> Result<Vec<Question>, StoreError>;

    async fn list(&self, filter: &QuestionFilter) -> Result<Vec<Question>, StoreError>;

    /// Inserts new questions. Fails with `Duplicate` without inserting anything
    /// if one of the ids is already taken.
    async fn bulk_insert(&self, questions: Vec<Question>) -> Result<usize, StoreError>;

    /// Replaces an existing question. Returns false if the id is unknown.
    async fn update(&self, question: Question) -> Result<bool, StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<ExamSession>, StoreError>;

    /// Inserts or replaces the session record.
    async fn put(&self, session: &ExamSession) -> Result<(), StoreError>;

    /// Every session, newest first. Used by reporting only.
    async fn list_all(&self) -> Result<Vec<ExamSession>, StoreError>;

    /// Whether any in-progress session still refers to the question.
    async fn has_open_session_with(&self, question_id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<ExamTemplate>, StoreError>;

    async fn list(&self) -> Result<Vec<ExamTemplate>, StoreError>;

    async fn put(&self, template: &ExamTemplate) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}
