// src/handlers/exam.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    error::AppError,
    exam::ExamService,
    models::session::{SaveProgressRequest, StartExamRequest, SubmitExamRequest},
    state::AppState,
};

/// Starts a new exam.
///
/// * Samples the questions (from a template or explicit filters).
/// * Returns the session id and the questions without answer keys.
pub async fn start_exam(
    State(exams): State<Arc<ExamService>>,
    Json(req): Json<StartExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let started = exams.start_exam(req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// Returns the current state of an exam for resume.
///
/// If the time limit has passed the exam is submitted with its last saved
/// answers and `phase` is "auto_submitted", so the client can move to the result view.
pub async fn get_exam_state(
    State(exams): State<Arc<ExamService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let state = exams.get_exam_state(&id, Utc::now()).await?;
    Ok(Json(state))
}

/// Periodic auto-save from the client. The full answer vector replaces the stored one.
pub async fn save_progress(
    State(exams): State<Arc<ExamService>>,
    Path(id): Path<String>,
    Json(req): Json<SaveProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = exams
        .save_progress(&id, req.answers, req.current_index, Utc::now())
        .await?;
    Ok(Json(outcome))
}

/// Submits the exam and returns the scored result.
pub async fn submit_exam(
    State(exams): State<Arc<ExamService>>,
    Path(id): Path<String>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = exams.submit_exam(&id, req.answers, Utc::now()).await?;
    Ok(Json(summary))
}

/// Result of a finished exam, rescored against the current question bank.
pub async fn get_exam_result(
    State(exams): State<Arc<ExamService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let summary = exams.get_exam_result(&id, Utc::now()).await?;
    Ok(Json(summary))
}

/// Lists the exam templates students can pick from.
pub async fn list_templates(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let templates = state.templates.list().await?;
    Ok(Json(templates))
}
