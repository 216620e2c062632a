//! Responses to context questions and the threads replying to them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An answer to a context question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextResponse {
    pub id: i64,
    #[serde(default)]
    pub response: String,
    #[serde(rename = "contextquestionid", default)]
    pub context_question_id: Option<i64>,
    /// Linked thread ids (filled locally)
    #[serde(skip)]
    pub threads: BTreeSet<i64>,
}

/// A reply attached to a context response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thread {
    pub id: i64,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "contextresponseid", default)]
    pub context_response_id: Option<i64>,
}

/// Flat row of the `GET contextResponse` listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextResponseObject {
    #[serde(rename = "surveyrequestid")]
    pub survey_id: i64,
    #[serde(rename = "contextquestionid")]
    pub context_question_id: i64,
    pub response: String,
}
