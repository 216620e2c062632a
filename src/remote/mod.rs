//! Remote client for the survey backend.
//!
//! One logical request per resource path; the response body comes back as raw
//! bytes and is turned into records by [`decode`].

pub mod decode;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Serialize;

use crate::auth::{CredentialProvider, Credentials};
use crate::errors::{Result, SyncError};

/// Resource paths consumed by the pipeline, relative to the base URL.
pub mod paths {
    pub const TOPICS: &str = "topic";
    pub const TOPIC_QUESTION: &str = "topicquestion";
    pub const CONTEXT_RESPONSES: &str = "contextResponse";
    pub const CONTEXTS: &str = "context";
    pub const CONTEXT_QUESTIONS: &str = "contextQuestion";

    pub fn topic(id: i64) -> String {
        format!("topic/{}", id)
    }

    pub fn topic_details(id: i64) -> String {
        format!("topic/{}/details", id)
    }

    pub fn context_response(id: i64) -> String {
        format!("contextresponse/{}", id)
    }

    pub fn thread(id: i64) -> String {
        format!("thread/{}", id)
    }
}

/// Whether a request may go out without credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// Attach a bearer token when one is available
    IfAvailable,
    /// Abort with `NotAuthenticated` before sending when no token is available
    Required,
}

/// HTTP client bound to one backend.
#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl RemoteClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::BadRequest(format!("Failed to build HTTP client: {}", e)))?;
        Self::with_client(http, base_url, credentials)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with a slash
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| SyncError::BadRequest(format!("Invalid base URL {}: {}", base_url, e)))?;

        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// Current credentials from the auth collaborator.
    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials.credentials()
    }

    /// Resolve a resource path against the base URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| SyncError::BadRequest(format!("Invalid path {}: {}", path, e)))
    }

    /// Issue one request and return the raw response body.
    pub async fn load(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        auth: Auth,
    ) -> Result<Vec<u8>> {
        let url = self.url(path)?;

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        match (self.credentials(), auth) {
            (Some(creds), _) => {
                let (name, value) = creds.bearer_header()?;
                request = request.header(name, value);
            }
            (None, Auth::Required) => {
                tracing::warn!("Refusing {} {}: no authenticated user", method, path);
                return Err(SyncError::NotAuthenticated);
            }
            (None, Auth::IfAvailable) => {}
        }

        if let Some(body) = body {
            request = request.body(body);
        }

        tracing::debug!("{} {}", method, path);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{} {} failed with status {}", method, path, status.as_u16());
            return Err(SyncError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.load(Method::GET, path, None, Auth::IfAvailable).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(body)
            .map_err(|e| SyncError::BadRequest(format!("Failed to encode body for {}: {}", path, e)))?;
        self.load(Method::POST, path, Some(body), Auth::Required).await
    }

    pub async fn delete(&self, path: &str) -> Result<Vec<u8>> {
        self.load(Method::DELETE, path, None, Auth::Required).await
    }
}
