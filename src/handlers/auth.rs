// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    state::AppState,
    utils::{
        hash::verify_password,
        jwt::{ADMIN_ROLE, sign_jwt},
    },
};

/// DTO for admin login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Authenticates the configured admin and returns a JWT token.
///
/// Students never log in; only question and template management is gated.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let admin = state
        .admin
        .as_ref()
        .ok_or(AppError::AuthError("Admin login is disabled".to_string()))?;

    if payload.username != admin.username {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    if !verify_password(&payload.password, &admin.password_hash)? {
        tracing::warn!("Failed admin login for {}", payload.username);
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = sign_jwt(
        &admin.username,
        ADMIN_ROLE,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "expires_in": state.config.jwt_expiration
    })))
}
