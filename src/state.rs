// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    exam::ExamService,
    store::{
        QuestionStore, SessionStore, TemplateStore,
        memory::{MemoryQuestionStore, MemorySessionStore, MemoryTemplateStore},
        postgres::{PgQuestionStore, PgSessionStore, PgTemplateStore},
    },
    utils::hash::hash_password,
};

/// The admin account configured through the environment.
#[derive(Clone)]
pub struct AdminCredential {
    pub username: String,
    /// Argon2 hash, computed once at startup.
    pub password_hash: String,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub exams: Arc<ExamService>,
    pub questions: Arc<dyn QuestionStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub admin: Option<AdminCredential>,
}

impl AppState {
    pub fn new(
        config: Config,
        questions: Arc<dyn QuestionStore>,
        sessions: Arc<dyn SessionStore>,
        templates: Arc<dyn TemplateStore>,
    ) -> Result<Self, AppError> {
        let admin = match (&config.admin_username, &config.admin_password) {
            (Some(username), Some(password)) => Some(AdminCredential {
                username: username.clone(),
                password_hash: hash_password(password)?,
            }),
            _ => None,
        };

        let exams = Arc::new(ExamService::new(
            questions.clone(),
            sessions,
            templates.clone(),
        ));

        Ok(Self {
            config,
            exams,
            questions,
            templates,
            admin,
        })
    }

    /// State backed by in-process stores.
    pub fn in_memory(config: Config) -> Result<Self, AppError> {
        Self::new(
            config,
            Arc::new(MemoryQuestionStore::new()),
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryTemplateStore::new()),
        )
    }

    /// State backed by Postgres.
    pub fn postgres(config: Config, pool: PgPool) -> Result<Self, AppError> {
        Self::new(
            config,
            Arc::new(PgQuestionStore::new(pool.clone())),
            Arc::new(PgSessionStore::new(pool.clone())),
            Arc::new(PgTemplateStore::new(pool)),
        )
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<ExamService> {
    fn from_ref(state: &AppState) -> Self {
        state.exams.clone()
    }
}
