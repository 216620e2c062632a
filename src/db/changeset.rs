//! Pending changes to the local graph, applied in one transaction.

use std::collections::BTreeSet;

use crate::models::{
    Context, ContextQuestion, ContextResponse, QuestionKind, RequestQuestion, Thread, Topic,
};

/// A batch of upserts, links and deletes.
///
/// Pipeline stages accumulate into a `ChangeSet` while their children resolve
/// and hand it to [`Repository::save`](super::Repository::save) once the stage
/// closes. Links are sets: recording the same link twice is harmless.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub(crate) topics: Vec<Topic>,
    pub(crate) context_questions: Vec<ContextQuestion>,
    pub(crate) request_questions: Vec<RequestQuestion>,
    pub(crate) topic_links: Vec<(String, QuestionKind, i64)>,
    pub(crate) retained_links: Vec<(String, QuestionKind, BTreeSet<i64>)>,
    pub(crate) retained_members: Vec<(String, BTreeSet<String>)>,
    pub(crate) responses: Vec<ContextResponse>,
    pub(crate) response_links: Vec<(i64, i64)>,
    pub(crate) threads: Vec<Thread>,
    pub(crate) thread_links: Vec<(i64, i64)>,
    pub(crate) contexts: Vec<Context>,
    pub(crate) deleted_topics: Vec<String>,
    pub(crate) retain_join_code: Option<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
            && self.context_questions.is_empty()
            && self.request_questions.is_empty()
            && self.topic_links.is_empty()
            && self.retained_links.is_empty()
            && self.retained_members.is_empty()
            && self.responses.is_empty()
            && self.response_links.is_empty()
            && self.threads.is_empty()
            && self.thread_links.is_empty()
            && self.contexts.is_empty()
            && self.deleted_topics.is_empty()
            && self.retain_join_code.is_none()
    }

    /// Insert or update a topic by join code, with its members and any
    /// question links already present on it.
    pub fn upsert_topic(&mut self, topic: &Topic) {
        for id in &topic.context_questions {
            self.link_question(&topic.join_code, QuestionKind::Context, *id);
        }
        for id in &topic.request_questions {
            self.link_question(&topic.join_code, QuestionKind::Request, *id);
        }
        self.topics.push(topic.clone());
    }

    pub fn upsert_context_question(&mut self, question: &ContextQuestion) {
        self.context_questions.push(question.clone());
    }

    pub fn upsert_request_question(&mut self, question: &RequestQuestion) {
        self.request_questions.push(question.clone());
    }

    /// Link a question into one of a topic's relationship collections.
    pub fn link_question(&mut self, join_code: &str, kind: QuestionKind, question_id: i64) {
        self.topic_links
            .push((join_code.to_string(), kind, question_id));
    }

    /// Drop the topic's links of `kind` to questions outside `question_ids`.
    ///
    /// Applied before this set's own links are inserted, so a topic ends up
    /// with at most the listed questions.
    pub fn retain_question_links(
        &mut self,
        join_code: &str,
        kind: QuestionKind,
        question_ids: BTreeSet<i64>,
    ) {
        self.retained_links
            .push((join_code.to_string(), kind, question_ids));
    }

    /// Drop the topic's member links to members not in the topic's own list.
    pub fn retain_members(&mut self, topic: &Topic) {
        let member_ids = topic.members.iter().map(|m| m.id.clone()).collect();
        self.retained_members
            .push((topic.join_code.clone(), member_ids));
    }

    pub fn upsert_response(&mut self, response: &ContextResponse) {
        for thread_id in &response.threads {
            self.link_thread(response.id, *thread_id);
        }
        self.responses.push(response.clone());
    }

    /// Attach a response to the context question it answers.
    pub fn link_response(&mut self, question_id: i64, response_id: i64) {
        self.response_links.push((question_id, response_id));
    }

    pub fn upsert_thread(&mut self, thread: &Thread) {
        self.threads.push(thread.clone());
    }

    /// Attach a thread to the response it replies to.
    pub fn link_thread(&mut self, response_id: i64, thread_id: i64) {
        self.thread_links.push((response_id, thread_id));
    }

    pub fn upsert_context(&mut self, context: &Context) {
        self.contexts.push(context.clone());
    }

    /// Remove a topic and its relationship rows.
    pub fn delete_topic(&mut self, join_code: &str) {
        self.deleted_topics.push(join_code.to_string());
    }

    /// Remove every topic whose join code differs from `join_code`.
    pub fn retain_only(&mut self, join_code: &str) {
        self.retain_join_code = Some(join_code.to_string());
    }
}
