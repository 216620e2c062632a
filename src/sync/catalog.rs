//! Default contexts and questions, responses and threads.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::fanout::FanOut;
use super::{FetchReport, TopicSync};
use crate::db::ChangeSet;
use crate::errors::{ChildFailure, Result};
use crate::models::{Context, ContextQuestion, ContextResponse, ContextResponseObject, Thread};
use crate::remote::{decode, paths};

impl TopicSync {
    /// Fetch and save the default contexts.
    pub async fn get_default_contexts(&self) -> Result<Vec<Context>> {
        let data = self.remote.get(paths::CONTEXTS).await?;
        let contexts: Vec<Context> = decode::require(&data, "contexts")?;

        let mut changes = ChangeSet::new();
        for context in &contexts {
            changes.upsert_context(context);
        }
        self.repo.save(&changes).await?;
        Ok(contexts)
    }

    /// Fetch and save the template context questions.
    pub async fn get_default_context_questions(&self) -> Result<Vec<ContextQuestion>> {
        let data = self.remote.get(paths::CONTEXT_QUESTIONS).await?;
        let questions: Vec<ContextQuestion> = decode::require(&data, "context questions")?;

        let mut changes = ChangeSet::new();
        for question in &questions {
            changes.upsert_context_question(question);
        }
        self.repo.save(&changes).await?;
        Ok(questions)
    }

    /// The flat response listing; not persisted.
    pub async fn list_context_responses(&self) -> Result<Vec<ContextResponseObject>> {
        let data = self.remote.get(paths::CONTEXT_RESPONSES).await?;
        decode::require(&data, "context responses")
    }

    /// Fetch responses by id and link each to `question_id`.
    pub async fn get_context_responses(&self, question_id: i64, ids: &[i64]) -> Result<FetchReport> {
        let changes = Arc::new(Mutex::new(ChangeSet::new()));
        let fanout = FanOut::new(self.handle.clone());

        for &id in ids {
            let remote = self.remote.clone();
            let changes = changes.clone();
            fanout.spawn(id, async move {
                let path = paths::context_response(id);
                let data = remote.get(&path).await?;
                let response: ContextResponse = decode::require(&data, &path)?;
                let mut changes = changes.lock().await;
                changes.upsert_response(&response);
                changes.link_response(question_id, response.id);
                Ok(())
            });
        }

        let report = collect(fanout.join().await, paths::context_response);
        let changes = changes.lock().await;
        self.repo.save(&changes).await.map_err(|e| {
            tracing::error!("Error saving responses for question {}: {}", question_id, e);
            e
        })?;
        Ok(report)
    }

    /// Fetch threads by id and link each to `response_id`.
    pub async fn get_threads(&self, response_id: i64, ids: &[i64]) -> Result<FetchReport> {
        let changes = Arc::new(Mutex::new(ChangeSet::new()));
        let fanout = FanOut::new(self.handle.clone());

        for &id in ids {
            let remote = self.remote.clone();
            let changes = changes.clone();
            fanout.spawn(id, async move {
                let path = paths::thread(id);
                let data = remote.get(&path).await?;
                let thread: Thread = decode::require(&data, &path)?;
                let mut changes = changes.lock().await;
                changes.upsert_thread(&thread);
                changes.link_thread(response_id, thread.id);
                Ok(())
            });
        }

        let report = collect(fanout.join().await, paths::thread);
        let changes = changes.lock().await;
        self.repo.save(&changes).await.map_err(|e| {
            tracing::error!("Error saving threads for response {}: {}", response_id, e);
            e
        })?;
        Ok(report)
    }
}

fn collect(results: Vec<(i64, Result<()>)>, path: fn(i64) -> String) -> FetchReport {
    let mut report = FetchReport::default();
    for (id, result) in results {
        match result {
            Ok(()) => {
                report.fetched.insert(id);
            }
            Err(e) => {
                tracing::warn!("Failed to retrieve {}: {}", path(id), e);
                report.failures.push(ChildFailure::new(path(id), &e));
            }
        }
    }
    report
}
