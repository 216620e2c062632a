//! Topic ingestion: shells, then details, then questions, saved per topic.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::fanout::FanOut;
use super::{SyncReport, TopicSync};
use crate::db::ChangeSet;
use crate::errors::{ChildFailure, Result, SyncError};
use crate::models::{ContextQuestion, QuestionKind, RequestQuestion, Topic, TopicDetails};
use crate::remote::{decode, paths, RemoteClient};

impl TopicSync {
    /// Fetch every topic from the backend and save it locally with its
    /// context and request questions.
    ///
    /// A topic list that fails to decode aborts the run. Missing details or
    /// questions only leave gaps, listed in the report. A topic's question
    /// and member links are replaced by the server's lists. Local topics
    /// whose join code the backend no longer returns are removed.
    pub async fn get_topics(&self) -> Result<SyncReport> {
        let data = self.remote.get(paths::TOPICS).await?;
        let shells = dedupe_join_codes(decode::require(&data, "topic list")?);
        tracing::info!("Fetched {} topic shells", shells.len());

        let mut report = SyncReport::default();

        // Stage 1: details for every topic, one barrier for the whole stage
        let mut details = self.fetch_all_details(&shells, &mut report).await;

        // Stage 2: questions, one barrier per topic
        let remote_codes: BTreeSet<String> = shells.iter().map(|t| t.join_code.clone()).collect();
        let topics = FanOut::new(self.handle.clone());
        for shell in shells {
            let topic_details = details.remove(&shell.join_code);
            let this = self.clone();
            topics.spawn(shell.join_code.clone(), async move {
                this.sync_topic(shell, topic_details).await
            });
        }

        let mut save_error = None;
        for (join_code, result) in topics.join().await {
            match result {
                Ok(failures) => {
                    report.synced.push(join_code);
                    report.failures.extend(failures);
                }
                Err(e) => {
                    tracing::error!("Error saving topic {}: {}", join_code, e);
                    report.failures.push(ChildFailure::new(join_code, &e));
                    save_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = save_error {
            return Err(e);
        }

        report.removed = self.prune_topics(&remote_codes).await?;
        report.synced.sort();

        tracing::info!(
            "Synced {} topics ({} removed, {} partial failures)",
            report.synced.len(),
            report.removed.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Fetch `topic/{id}/details` for every shell, keyed by join code.
    async fn fetch_all_details(
        &self,
        shells: &[Topic],
        report: &mut SyncReport,
    ) -> HashMap<String, TopicDetails> {
        let fanout = FanOut::new(self.handle.clone());

        for topic in shells {
            let Some(id) = topic.id else {
                fanout.record(
                    (topic.join_code.clone(), format!("topic {}", topic.join_code)),
                    Err(SyncError::BadRequest(format!(
                        "Topic {} has no server id",
                        topic.join_code
                    ))),
                );
                continue;
            };

            let path = paths::topic_details(id);
            let remote = self.remote.clone();
            fanout.spawn((topic.join_code.clone(), path.clone()), async move {
                let data = remote.get(&path).await?;
                decode::require::<TopicDetails>(&data, &path)
            });
        }

        let mut details = HashMap::new();
        for ((join_code, resource), result) in fanout.join().await {
            match result {
                Ok(topic_details) => {
                    details.insert(join_code, topic_details);
                }
                Err(e) => {
                    tracing::warn!("Couldn't get details for topic {}: {}", join_code, e);
                    report.failures.push(ChildFailure::new(resource, &e));
                }
            }
        }
        details
    }

    /// Fetch and link one topic's questions, then save the topic in one call.
    async fn sync_topic(
        &self,
        shell: Topic,
        details: Option<TopicDetails>,
    ) -> Result<Vec<ChildFailure>> {
        let changes = Arc::new(Mutex::new(ChangeSet::new()));
        {
            let mut changes = changes.lock().await;
            changes.retain_members(&shell);
            changes.upsert_topic(&shell);
        }

        let mut failures = Vec::new();

        if let Some(details) = details {
            let context_ids = details.context_ids();
            let request_ids = details.request_ids();

            // The server's lists replace the local links. Listed questions
            // that fail to fetch keep whatever link they already had.
            {
                let mut changes = changes.lock().await;
                changes.retain_question_links(
                    &shell.join_code,
                    QuestionKind::Context,
                    context_ids.clone(),
                );
                changes.retain_question_links(
                    &shell.join_code,
                    QuestionKind::Request,
                    request_ids.clone(),
                );
            }
            tracing::debug!(
                "Topic {}: {} context ids, {} request ids",
                shell.join_code,
                context_ids.len(),
                request_ids.len()
            );

            let questions = FanOut::new(self.handle.clone());
            let wanted = context_ids
                .into_iter()
                .map(|id| (QuestionKind::Context, id))
                .chain(request_ids.into_iter().map(|id| (QuestionKind::Request, id)));

            for (kind, id) in wanted {
                let path = kind.path(id);
                let remote = self.remote.clone();
                let changes = changes.clone();
                let join_code = shell.join_code.clone();
                questions.spawn(path.clone(), async move {
                    fetch_and_link_question(&remote, &changes, &join_code, kind, &path).await
                });
            }

            for (path, result) in questions.join().await {
                if let Err(e) = result {
                    tracing::warn!("Didn't receive question {}: {}", path, e);
                    failures.push(ChildFailure::new(path, &e));
                }
            }
        }

        let changes = changes.lock().await;
        self.repo.save(&changes).await?;
        Ok(failures)
    }

    /// Remove local topics whose join code is not in `remote_codes`.
    async fn prune_topics(&self, remote_codes: &BTreeSet<String>) -> Result<Vec<String>> {
        let stale: Vec<String> = self
            .repo
            .list_topics()
            .await?
            .into_iter()
            .map(|t| t.join_code)
            .filter(|code| !remote_codes.contains(code))
            .collect();

        if stale.is_empty() {
            return Ok(stale);
        }

        let mut changes = ChangeSet::new();
        for join_code in &stale {
            changes.delete_topic(join_code);
        }
        self.repo.save(&changes).await?;
        tracing::info!("Removed {} topics no longer on the server", stale.len());
        Ok(stale)
    }
}

/// Keep the first topic for each join code; later ones are logged and dropped.
pub(super) fn dedupe_join_codes(shells: Vec<Topic>) -> Vec<Topic> {
    let mut seen = HashSet::new();
    shells
        .into_iter()
        .filter(|topic| {
            let first = seen.insert(topic.join_code.clone());
            if !first {
                tracing::warn!(
                    "Server listed join code {} more than once, ignoring topic {:?}",
                    topic.join_code,
                    topic.id
                );
            }
            first
        })
        .collect()
}

/// Fetch one question and link it into the topic as soon as it arrives.
async fn fetch_and_link_question(
    remote: &RemoteClient,
    changes: &Mutex<ChangeSet>,
    join_code: &str,
    kind: QuestionKind,
    path: &str,
) -> Result<()> {
    let data = remote.get(path).await?;
    match kind {
        QuestionKind::Context => {
            let question: ContextQuestion = decode::require(&data, path)?;
            let mut changes = changes.lock().await;
            changes.upsert_context_question(&question);
            changes.link_question(join_code, kind, question.id);
        }
        QuestionKind::Request => {
            let question: RequestQuestion = decode::require(&data, path)?;
            let mut changes = changes.lock().await;
            changes.upsert_request_question(&question);
            changes.link_question(join_code, kind, question.id);
        }
    }
    Ok(())
}
