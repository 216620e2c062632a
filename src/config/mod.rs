//! Configuration module for the sync engine.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default request timeout when `TOPIC_SYNC_TIMEOUT_SECS` is unset or invalid.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL every resource path is resolved against
    pub base_url: String,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Bearer token for the backend
    pub auth_token: Option<String>,
    /// Id of the authenticated user (leader id for created topics)
    pub user_id: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url = env::var("TOPIC_SYNC_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080/api/".to_string());

        let db_path = env::var("TOPIC_SYNC_DB_PATH")
            .unwrap_or_else(|_| "./data/topics.sqlite".to_string())
            .into();

        let log_level = env::var("TOPIC_SYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let auth_token = env::var("TOPIC_SYNC_TOKEN").ok().filter(|t| !t.is_empty());
        let user_id = env::var("TOPIC_SYNC_USER_ID").ok().filter(|u| !u.is_empty());

        let request_timeout = env::var("TOPIC_SYNC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Self {
            base_url,
            db_path,
            log_level,
            auth_token,
            user_id,
            request_timeout,
        }
    }
}
