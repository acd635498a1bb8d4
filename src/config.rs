// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Question count used when a start request does not specify one.
pub const DEFAULT_QUESTION_COUNT: usize = 20;

/// Upper bound for the number of questions in a single exam.
pub const MAX_QUESTION_COUNT: usize = 200;

/// Upper bound for a configured time limit.
pub const MAX_TIME_LIMIT_MINUTES: u32 = 600;

/// A question needs at least this many option slots.
pub const MIN_OPTIONS: usize = 2;

/// And at most this many.
pub const MAX_OPTIONS: usize = 6;

/// Placeholder used by imported spreadsheets for an unused option slot.
pub const BLANK_OPTION: &str = "BLANK";

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When absent the service runs on in-memory stores.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Admin token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username,
            admin_password,
            port,
        }
    }
}
