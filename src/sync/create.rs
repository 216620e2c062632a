//! Topic creation and question linking.

use uuid::Uuid;

use super::fanout::FanOut;
use super::{LinkReport, TopicSync};
use crate::db::ChangeSet;
use crate::errors::{ChildFailure, Result, SyncError};
use crate::models::{ContextQuestion, CreatedTopic, QuestionKind, RequestQuestion, Topic, TopicQuestion};
use crate::remote::{decode, paths};

impl TopicSync {
    /// Create a topic led by the signed-in user and link its questions.
    ///
    /// Returns the generated join code. Nothing is sent when no user is
    /// signed in. The topic is saved locally before it is posted; that first
    /// save and the one after the id patch are best-effort.
    pub async fn post_topic(
        &self,
        name: &str,
        context_id: i64,
        context_questions: &[ContextQuestion],
        request_questions: &[RequestQuestion],
    ) -> Result<String> {
        let Some(credentials) = self.remote.credentials() else {
            tracing::warn!("User isn't logged in, not posting topic {}", name);
            return Err(SyncError::NotAuthenticated);
        };

        let join_code = Uuid::new_v4().to_string();
        let mut topic = Topic::new(&join_code, credentials.user_id, name, context_id);
        self.save_best_effort(&topic).await;

        let data = match self.remote.post_json(paths::TOPICS, &topic).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Error POSTing topic {}: {}", name, e);
                return Err(e);
            }
        };

        let created: CreatedTopic = decode::require(&data, "id of newly created topic")?;
        topic.id = Some(created.topic.id);
        self.save_best_effort(&topic).await;
        tracing::info!("Created topic {} with id {}", join_code, created.topic.id);

        self.add_questions(context_questions, request_questions, &mut topic)
            .await?;

        Ok(join_code)
    }

    /// Attach questions to a topic locally and register each link remotely.
    ///
    /// The local link is made before any POST and is kept whatever the
    /// backend answers, so local and remote state may disagree until the next
    /// ingestion run. Failed link POSTs are listed in the report; only a
    /// failure of the final save fails the call.
    pub async fn add_questions(
        &self,
        context_questions: &[ContextQuestion],
        request_questions: &[RequestQuestion],
        topic: &mut Topic,
    ) -> Result<LinkReport> {
        topic
            .context_questions
            .extend(context_questions.iter().map(|q| q.id));
        topic
            .request_questions
            .extend(request_questions.iter().map(|q| q.id));

        let mut changes = ChangeSet::new();
        for question in context_questions {
            changes.upsert_context_question(question);
        }
        for question in request_questions {
            changes.upsert_request_question(question);
        }
        changes.upsert_topic(topic);

        let links = context_questions
            .iter()
            .map(|q| (QuestionKind::Context, q.id))
            .chain(request_questions.iter().map(|q| (QuestionKind::Request, q.id)));

        let fanout = FanOut::new(self.handle.clone());
        for (kind, question_id) in links {
            let Some(topic_id) = topic.id else {
                fanout.record(
                    (kind, question_id),
                    Err(SyncError::BadRequest(format!(
                        "Topic {} has no server id",
                        topic.join_code
                    ))),
                );
                continue;
            };

            let link = TopicQuestion {
                topic_id,
                question_id,
            };
            let remote = self.remote.clone();
            fanout.spawn((kind, question_id), async move {
                remote.post_json(paths::TOPIC_QUESTION, &link).await?;
                Ok(link)
            });
        }

        let mut report = LinkReport::default();
        for ((kind, question_id), result) in fanout.join().await {
            match result {
                Ok(link) => report.linked.push(link),
                Err(e) => {
                    tracing::warn!(
                        "Couldn't link {:?} question {} to topic {}: {}",
                        kind,
                        question_id,
                        topic.join_code,
                        e
                    );
                    report.failures.push(ChildFailure::new(
                        format!("{} {}", paths::TOPIC_QUESTION, question_id),
                        &e,
                    ));
                }
            }
        }

        if let Err(e) = self.repo.save(&changes).await {
            tracing::error!("Error saving question links for {}: {}", topic.join_code, e);
            return Err(e);
        }

        Ok(report)
    }

    async fn save_best_effort(&self, topic: &Topic) {
        let mut changes = ChangeSet::new();
        changes.upsert_topic(topic);
        if let Err(e) = self.repo.save(&changes).await {
            tracing::warn!("Error saving topic {} locally: {}", topic.topic_name, e);
        }
    }
}
