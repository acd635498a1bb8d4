// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        question::{CreateQuestionRequest, Question, QuestionFilter},
        template::CreateTemplateRequest,
    },
    state::AppState,
};

fn build_question(payload: CreateQuestionRequest) -> Result<Question, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    payload.into_question(Utc::now()).map_err(AppError::BadRequest)
}

/// Lists questions, optionally filtered by category, difficulty and type.
/// Admin only. Includes answer keys.
pub async fn list_questions(
    State(state): State<AppState>,
    Query(filter): Query<QuestionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let questions = state.questions.list(&filter).await?;
    Ok(Json(questions))
}

/// Admin only.
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let question = state
        .questions
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Question not found"))?;

    Ok(Json(question))
}

/// Creates a single question.
/// Admin only.
pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question = build_question(payload)?;
    state.questions.bulk_insert(vec![question.clone()]).await?;

    tracing::info!("Question {} created", question.id);
    Ok((StatusCode::CREATED, Json(question)))
}

/// Bulk import of already-parsed question records.
///
/// All-or-nothing: one invalid or duplicate entry rejects the whole batch.
/// Admin only.
pub async fn import_questions(
    State(state): State<AppState>,
    Json(payload): Json<Vec<CreateQuestionRequest>>,
) -> Result<impl IntoResponse, AppError> {
    if payload.is_empty() {
        return Err(AppError::BadRequest("No questions to import".to_string()));
    }

    let questions = payload
        .into_iter()
        .enumerate()
        .map(|(i, req)| {
            build_question(req).map_err(|e| match e {
                AppError::BadRequest(msg) => AppError::BadRequest(format!("entry {}: {}", i + 1, msg)),
                other => other,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let imported = state.questions.bulk_insert(questions).await?;

    tracing::info!("Imported {} questions", imported);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "imported": imported })),
    ))
}

/// Replaces a question.
///
/// Sessions that already finished are not rescored in storage, but their
/// result view reads the new answer key.
/// Admin only.
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.id = Some(id);
    let question = build_question(payload)?;

    if !state.questions.update(question.clone()).await? {
        return Err(AppError::not_found("Question not found"));
    }

    Ok(Json(question))
}

/// Refused with 409 while an exam in progress still uses the question.
/// Admin only.
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.exams.delete_question(&id).await? {
        return Err(AppError::not_found("Question not found"));
    }

    tracing::info!("Question {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Admin only.
pub async fn create_template(
    State(state): State<AppState>,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let template = payload
        .into_template(uuid::Uuid::new_v4().to_string(), Utc::now())
        .map_err(AppError::BadRequest)?;
    state.templates.put(&template).await?;

    Ok((StatusCode::CREATED, Json(template)))
}

/// Admin only.
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let existing = state
        .templates
        .get(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Template not found"))?;

    let created_at = existing.created_at.unwrap_or_else(Utc::now);
    let template = payload
        .into_template(id, created_at)
        .map_err(AppError::BadRequest)?;
    state.templates.put(&template).await?;

    Ok(Json(template))
}

/// Admin only. Sessions keep the template id they were started from.
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.templates.delete(&id).await? {
        return Err(AppError::not_found("Template not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists every exam session, newest first.
/// Admin only.
pub async fn list_sessions(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let sessions = state.exams.list_sessions().await?;
    Ok(Json(sessions))
}

/// Finished sessions grouped by template, category and difficulty.
/// Admin only.
pub async fn session_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = state.exams.session_stats().await?;
    Ok(Json(stats))
}
