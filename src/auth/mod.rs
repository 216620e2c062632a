//! Credential lookup for authenticated requests.
//!
//! Token storage and refresh live outside this crate; the engine only asks a
//! [`CredentialProvider`] for the current credentials right before a request.

use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::config::Config;
use crate::errors::SyncError;

/// Credentials of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: String,
    pub token: String,
}

impl Credentials {
    /// Build the `Authorization: Bearer ...` header value.
    pub fn bearer_header(&self) -> Result<(reqwest::header::HeaderName, HeaderValue), SyncError> {
        let value = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| SyncError::BadRequest(format!("Invalid bearer token: {}", e)))?;
        Ok((AUTHORIZATION, value))
    }
}

/// Source of the current credentials, if any.
pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Option<Credentials>;
}

/// Fixed credentials, typically taken from the environment.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    inner: Option<Credentials>,
}

impl StaticCredentials {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            inner: Some(Credentials {
                user_id: user_id.into(),
                token: token.into(),
            }),
        }
    }

    /// No signed-in user.
    pub fn anonymous() -> Self {
        Self { inner: None }
    }

    /// Credentials from `TOPIC_SYNC_USER_ID` / `TOPIC_SYNC_TOKEN`; both must be set.
    pub fn from_config(config: &Config) -> Self {
        match (&config.user_id, &config.auth_token) {
            (Some(user_id), Some(token)) => Self::new(user_id.clone(), token.clone()),
            _ => Self::anonymous(),
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> Option<Credentials> {
        self.inner.clone()
    }
}
