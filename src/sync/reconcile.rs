//! Join-code refresh and deletion.

use super::ingest::dedupe_join_codes;
use super::TopicSync;
use crate::db::ChangeSet;
use crate::errors::{Result, SyncError};
use crate::models::Topic;
use crate::remote::{decode, paths};

impl TopicSync {
    /// Fetch the topic carrying `join_code` and make it the only local topic.
    ///
    /// Every other local topic is deleted, including ones cached by earlier
    /// runs. When no remote topic carries the join code nothing is written
    /// and `NotFound` is returned.
    pub async fn get_topic(&self, join_code: &str) -> Result<Topic> {
        let data = self.remote.get(paths::TOPICS).await?;
        let shells = dedupe_join_codes(decode::require(&data, "topic list")?);

        let (matching, others): (Vec<Topic>, Vec<Topic>) = shells
            .into_iter()
            .partition(|topic| topic.join_code == join_code);

        if matching.is_empty() {
            tracing::info!("Join code {} not found on server", join_code);
            return Err(SyncError::NotFound(format!("Join code {}", join_code)));
        }
        tracing::debug!(
            "Discarding {} remote topics not using join code {}",
            others.len(),
            join_code
        );

        let mut changes = ChangeSet::new();
        for topic in &matching {
            changes.retain_members(topic);
            changes.upsert_topic(topic);
        }
        changes.retain_only(join_code);
        self.repo.save(&changes).await?;

        self.repo
            .get_topic_by_join_code(join_code)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("Join code {}", join_code)))
    }

    /// Delete a topic on the backend.
    ///
    /// Only the topic's leader may call this; the check is the caller's.
    /// The local copy is left alone, see [`TopicSync::delete_local_topics`].
    pub async fn delete_topic(&self, topic: &Topic) -> Result<()> {
        let Some(id) = topic.id else {
            return Err(SyncError::BadRequest(format!(
                "Topic {} has no server id",
                topic.join_code
            )));
        };

        self.remote.delete(&paths::topic(id)).await?;
        tracing::info!("Deleted topic {} on the server", id);
        Ok(())
    }

    /// Remove topics from the local store only.
    pub async fn delete_local_topics(&self, topics: &[Topic]) -> Result<()> {
        let mut changes = ChangeSet::new();
        for topic in topics {
            changes.delete_topic(&topic.join_code);
        }

        self.repo.save(&changes).await.map_err(|e| {
            tracing::error!("Delete topics save error: {}", e);
            e
        })
    }
}
