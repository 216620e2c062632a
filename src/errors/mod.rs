//! Error handling module for the sync engine.
//!
//! Provides the error taxonomy shared by the remote client, the local store
//! and the pipeline, with stable machine-readable codes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const STATUS: &str = "STATUS";
    pub const TRANSPORT: &str = "TRANSPORT";
    pub const DECODE: &str = "DECODE";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const PERSISTENCE: &str = "PERSISTENCE";
    pub const NOT_AUTHENTICATED: &str = "NOT_AUTHENTICATED";
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Sync engine error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The request could not be constructed (bad URL, missing server id, ...)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The backend answered with a non-success status
    #[error("{path} returned status {status}")]
    Status { status: u16, path: String },

    /// Connection-level failure before a status was received
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Semantic not-found (e.g. no topic carries the requested join code)
    #[error("not found: {0}")]
    NotFound(String),

    /// Local store failure
    #[error("persistence error: {0}")]
    Persistence(String),

    /// No authenticated user is available
    #[error("not authenticated")]
    NotAuthenticated,
}

impl SyncError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::BadRequest(_) => codes::BAD_REQUEST,
            SyncError::Status { .. } => codes::STATUS,
            SyncError::Transport(_) => codes::TRANSPORT,
            SyncError::Decode(_) => codes::DECODE,
            SyncError::NotFound(_) => codes::NOT_FOUND,
            SyncError::Persistence(_) => codes::PERSISTENCE,
            SyncError::NotAuthenticated => codes::NOT_AUTHENTICATED,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        SyncError::Persistence(format!("Database error: {}", err))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("HTTP error: {:?}", err);
        if err.is_builder() {
            SyncError::BadRequest(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::Status {
                status: status.as_u16(),
                path: err.url().map(|u| u.path().to_string()).unwrap_or_default(),
            }
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        SyncError::Decode(format!("JSON error: {}", err))
    }
}

/// A failed child of a fan-out stage, kept for the caller instead of dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildFailure {
    /// Resource path (or local key) the child was working on
    pub resource: String,
    pub code: String,
    pub message: String,
}

impl ChildFailure {
    pub fn new(resource: impl Into<String>, error: &SyncError) -> Self {
        Self {
            resource: resource.into(),
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}
