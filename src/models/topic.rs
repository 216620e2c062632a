//! Topic model and the transient envelopes used while syncing topics.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Member;

/// A survey topic owned by a leader.
///
/// `id` is `None` until the backend assigns one. Locally a topic is keyed by
/// its join code, which survives the id patch after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Topic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "joincode")]
    pub join_code: String,
    #[serde(rename = "leaderid")]
    pub leader_id: String,
    #[serde(rename = "topicname")]
    pub topic_name: String,
    #[serde(rename = "contextid")]
    pub context_id: i64,
    /// Linked context question ids (filled by the pipeline, not on the wire)
    #[serde(skip)]
    pub context_questions: BTreeSet<i64>,
    /// Linked request question ids (filled by the pipeline, not on the wire)
    #[serde(skip)]
    pub request_questions: BTreeSet<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
}

impl Topic {
    /// A topic that has not been posted yet.
    pub fn new(
        join_code: impl Into<String>,
        leader_id: impl Into<String>,
        topic_name: impl Into<String>,
        context_id: i64,
    ) -> Self {
        Self {
            id: None,
            join_code: join_code.into(),
            leader_id: leader_id.into(),
            topic_name: topic_name.into(),
            context_id,
            context_questions: BTreeSet::new(),
            request_questions: BTreeSet::new(),
            members: Vec::new(),
        }
    }
}

/// Detail envelope for `GET topic/{id}/details`.
///
/// Only used to drive the question fan-out, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicDetails {
    #[serde(rename = "0")]
    pub details: TopicDetailObject,
    #[serde(rename = "contextquestions", default)]
    pub context_question_ids: Vec<ContextQuestionRef>,
    #[serde(rename = "requestquestions", default)]
    pub request_question_ids: Vec<RequestQuestionRef>,
}

impl TopicDetails {
    pub fn context_ids(&self) -> BTreeSet<i64> {
        self.context_question_ids
            .iter()
            .map(|q| q.context_question_id)
            .collect()
    }

    pub fn request_ids(&self) -> BTreeSet<i64> {
        self.request_question_ids
            .iter()
            .map(|q| q.request_question_id)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicDetailObject {
    #[serde(rename = "joincode")]
    pub join_code: String,
    pub id: i64,
    #[serde(rename = "contextid")]
    pub context_id: i64,
    #[serde(rename = "leaderid")]
    pub leader_id: String,
    #[serde(rename = "topicname")]
    pub topic_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContextQuestionRef {
    #[serde(rename = "contextquestionid")]
    pub context_question_id: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RequestQuestionRef {
    #[serde(rename = "requestquestionid")]
    pub request_question_id: i64,
}

/// Response envelope of `POST topic`: `{"topic": {"id": N}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedTopic {
    pub topic: CreatedTopicId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreatedTopicId {
    pub id: i64,
}

/// Body of `POST topicquestion`, registering one topic/question link remotely.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicQuestion {
    #[serde(rename = "topicid")]
    pub topic_id: i64,
    #[serde(rename = "questionid")]
    pub question_id: i64,
}
