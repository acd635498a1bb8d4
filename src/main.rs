// src/main.rs

use exam_portal::config::Config;
use exam_portal::routes;
use exam_portal::state::AppState;
use exam_portal::store::postgres;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let state = match config.database_url.clone() {
        Some(database_url) => {
            // Initialize Database Pool with Retry
            let mut retry_count = 0;
            let pool = loop {
                match PgPoolOptions::new()
                    .max_connections(5)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(&database_url)
                    .await
                {
                    Ok(pool) => break pool,
                    Err(e) => {
                        retry_count += 1;
                        if retry_count > 5 {
                            panic!("Failed to connect to database after 5 retries: {}", e);
                        }
                        tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            };

            tracing::info!("Database connected...");

            // Run Migrations Automatically
            tracing::info!("Running migrations...");
            postgres::migrate(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Migrations applied successfully.");

            AppState::postgres(config.clone(), pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, exams are kept in memory only");
            AppState::in_memory(config.clone())
        }
    }
    .expect("Failed to build application state");

    if state.admin.is_none() {
        tracing::warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set, admin routes are unreachable");
    }

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listening address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}
