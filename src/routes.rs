// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, exam},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, exams, templates, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new().route("/login", post(auth::login));

    // Student routes are open: the user name is free text, not an identity.
    let exam_routes = Router::new()
        .route("/", post(exam::start_exam))
        .route("/{id}", get(exam::get_exam_state))
        .route("/{id}/progress", put(exam::save_progress))
        .route("/{id}/submit", post(exam::submit_exam))
        .route("/{id}/result", get(exam::get_exam_result));

    let template_routes = Router::new().route("/", get(exam::list_templates));

    let admin_routes = Router::new()
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route("/questions/import", post(admin::import_questions))
        .route(
            "/questions/{id}",
            get(admin::get_question)
                .put(admin::update_question)
                .delete(admin::delete_question),
        )
        .route("/templates", post(admin::create_template))
        .route(
            "/templates/{id}",
            put(admin::update_template).delete(admin::delete_template),
        )
        .route("/sessions", get(admin::list_sessions))
        .route("/sessions/stats", get(admin::session_stats))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/templates", template_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
