// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{exam::ExamError, store::StoreError};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound { code: &'static str, message: String },

    // 409 Conflict (e.g., exam already finished, duplicate question id)
    Conflict { code: &'static str, message: String },

    // 410 Gone: the exam time ran out, the client should switch to the result view
    Gone(String),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound {
            code: "not_found",
            message: message.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response `{"error", "code"}` with the matching HTTP status.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            AppError::NotFound { code, message } => (StatusCode::NOT_FOUND, code, message),
            AppError::Conflict { code, message } => (StatusCode::CONFLICT, code, message),
            AppError::Gone(msg) => (StatusCode::GONE, "time_expired", msg),
        };
        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Maps the exam core taxonomy onto HTTP.
impl From<ExamError> for AppError {
    fn from(err: ExamError) -> Self {
        let message = err.to_string();
        match err {
            ExamError::NoMatchingQuestions => AppError::NotFound {
                code: "no_matching_questions",
                message,
            },
            ExamError::SessionNotFound(_) => AppError::NotFound {
                code: "session_not_found",
                message,
            },
            ExamError::TemplateNotFound(_) => AppError::NotFound {
                code: "template_not_found",
                message,
            },
            ExamError::SessionAlreadyTerminal | ExamError::AlreadyCompleted => {
                AppError::Conflict {
                    code: "exam_already_finished",
                    message,
                }
            }
            ExamError::StillInProgress => AppError::Conflict {
                code: "exam_in_progress",
                message,
            },
            ExamError::QuestionInUse(_) => AppError::Conflict {
                code: "question_in_use",
                message,
            },
            ExamError::TimeExpired => AppError::Gone(message),
            ExamError::InvalidInput(msg) => AppError::BadRequest(msg),
            ExamError::QuestionMissing(_) => AppError::InternalServerError(message),
            ExamError::Store(e) => AppError::from(e),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(id) => AppError::Conflict {
                code: "duplicate_id",
                message: format!("A record with id '{}' already exists", id),
            },
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}
