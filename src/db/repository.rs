//! Database repository for the local topic graph.
//!
//! Writes go through [`Repository::save`], one transaction per call, behind a
//! single-writer lock. Reads are plain queries against the pool.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;

use super::ChangeSet;
use crate::errors::SyncError;
use crate::models::{
    Context, ContextQuestion, ContextResponse, Member, QuestionKind, RequestQuestion, Thread,
    Topic,
};

const TOPIC_COLUMNS: &str = "join_code, id, leader_id, topic_name, context_id";

/// Database repository for all local data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            writer: Arc::new(Mutex::new(())),
        }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply a change set atomically.
    pub async fn save(&self, changes: &ChangeSet) -> Result<(), SyncError> {
        if changes.is_empty() {
            return Ok(());
        }

        // Only one save runs at a time, whatever task it comes from
        let _writer = self.writer.lock().await;
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for (join_code, member_ids) in &changes.retained_members {
            let ids = serde_json::to_string(member_ids).unwrap_or_else(|_| "[]".to_string());
            sqlx::query(
                r#"DELETE FROM topic_members WHERE topic_join_code = ?
                   AND member_id NOT IN (SELECT value FROM json_each(?))"#,
            )
            .bind(join_code)
            .bind(ids)
            .execute(&mut *tx)
            .await?;
        }

        for topic in &changes.topics {
            upsert_topic(&mut tx, topic, &now).await?;
        }

        for question in &changes.context_questions {
            sqlx::query(
                r#"INSERT INTO context_questions (id, question, template, synced_at)
                   VALUES (?, ?, ?, ?)
                   ON CONFLICT(id) DO UPDATE SET
                       question = excluded.question,
                       template = excluded.template,
                       synced_at = excluded.synced_at"#,
            )
            .bind(question.id)
            .bind(&question.question)
            .bind(question.template as i32)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        for question in &changes.request_questions {
            sqlx::query(
                r#"INSERT INTO request_questions (id, question, template, synced_at)
                   VALUES (?, ?, ?, ?)
                   ON CONFLICT(id) DO UPDATE SET
                       question = excluded.question,
                       template = excluded.template,
                       synced_at = excluded.synced_at"#,
            )
            .bind(question.id)
            .bind(&question.question)
            .bind(question.template as i32)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        for (join_code, kind, question_ids) in &changes.retained_links {
            let sql = format!(
                r#"DELETE FROM {} WHERE topic_join_code = ?
                   AND question_id NOT IN (SELECT value FROM json_each(?))"#,
                link_table(*kind)
            );
            sqlx::query(&sql)
                .bind(join_code)
                .bind(ids_json(&question_ids.iter().copied().collect::<Vec<_>>()))
                .execute(&mut *tx)
                .await?;
        }

        for (join_code, kind, question_id) in &changes.topic_links {
            let sql = format!(
                "INSERT OR IGNORE INTO {} (topic_join_code, question_id) VALUES (?, ?)",
                link_table(*kind)
            );
            sqlx::query(&sql)
                .bind(join_code)
                .bind(question_id)
                .execute(&mut *tx)
                .await?;
        }

        for response in &changes.responses {
            sqlx::query(
                r#"INSERT INTO context_responses (id, response, context_question_id, synced_at)
                   VALUES (?, ?, ?, ?)
                   ON CONFLICT(id) DO UPDATE SET
                       response = excluded.response,
                       context_question_id = COALESCE(excluded.context_question_id, context_responses.context_question_id),
                       synced_at = excluded.synced_at"#,
            )
            .bind(response.id)
            .bind(&response.response)
            .bind(response.context_question_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        for (question_id, response_id) in &changes.response_links {
            sqlx::query("UPDATE context_responses SET context_question_id = ? WHERE id = ?")
                .bind(question_id)
                .bind(response_id)
                .execute(&mut *tx)
                .await?;
        }

        for thread in &changes.threads {
            sqlx::query(
                r#"INSERT INTO threads (id, message, context_response_id, synced_at)
                   VALUES (?, ?, ?, ?)
                   ON CONFLICT(id) DO UPDATE SET
                       message = excluded.message,
                       context_response_id = COALESCE(excluded.context_response_id, threads.context_response_id),
                       synced_at = excluded.synced_at"#,
            )
            .bind(thread.id)
            .bind(&thread.message)
            .bind(thread.context_response_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        for (response_id, thread_id) in &changes.thread_links {
            sqlx::query("UPDATE threads SET context_response_id = ? WHERE id = ?")
                .bind(response_id)
                .bind(thread_id)
                .execute(&mut *tx)
                .await?;
        }

        for context in &changes.contexts {
            sqlx::query(
                r#"INSERT INTO contexts (id, title, synced_at) VALUES (?, ?, ?)
                   ON CONFLICT(id) DO UPDATE SET
                       title = excluded.title,
                       synced_at = excluded.synced_at"#,
            )
            .bind(context.id)
            .bind(&context.title)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        for join_code in &changes.deleted_topics {
            for table in [
                "topic_context_questions",
                "topic_request_questions",
                "topic_members",
            ] {
                let sql = format!("DELETE FROM {} WHERE topic_join_code = ?", table);
                sqlx::query(&sql).bind(join_code).execute(&mut *tx).await?;
            }
            sqlx::query("DELETE FROM topics WHERE join_code = ?")
                .bind(join_code)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(join_code) = &changes.retain_join_code {
            for table in [
                "topic_context_questions",
                "topic_request_questions",
                "topic_members",
            ] {
                let sql = format!("DELETE FROM {} WHERE topic_join_code != ?", table);
                sqlx::query(&sql).bind(join_code).execute(&mut *tx).await?;
            }
            let result = sqlx::query("DELETE FROM topics WHERE join_code != ?")
                .bind(join_code)
                .execute(&mut *tx)
                .await?;
            tracing::debug!(
                "Removed {} local topics not matching join code {}",
                result.rows_affected(),
                join_code
            );
        }

        tx.commit().await?;
        Ok(())
    }

    // ==================== TOPIC QUERIES ====================

    /// List all local topics with their relationships.
    pub async fn list_topics(&self) -> Result<Vec<Topic>, SyncError> {
        let sql = format!("SELECT {} FROM topics ORDER BY topic_name, join_code", TOPIC_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        self.hydrate_topics(rows.iter().map(topic_from_row).collect())
            .await
    }

    /// Get a topic by join code.
    pub async fn get_topic_by_join_code(&self, join_code: &str) -> Result<Option<Topic>, SyncError> {
        let sql = format!("SELECT {} FROM topics WHERE join_code = ?", TOPIC_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(join_code)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut topics = self.hydrate_topics(vec![topic_from_row(&row)]).await?;
                Ok(topics.pop())
            }
            None => Ok(None),
        }
    }

    /// Topics among `ids` that `user_id` leads.
    pub async fn leader_topics(&self, user_id: &str, ids: &[i64]) -> Result<Vec<Topic>, SyncError> {
        let sql = format!(
            r#"SELECT {} FROM topics
               WHERE leader_id = ? AND id IN (SELECT value FROM json_each(?))
               ORDER BY topic_name"#,
            TOPIC_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(ids_json(ids))
            .fetch_all(&self.pool)
            .await?;
        self.hydrate_topics(rows.iter().map(topic_from_row).collect())
            .await
    }

    /// Topics among `ids` that list `user_id` as a member.
    pub async fn member_topics(&self, user_id: &str, ids: &[i64]) -> Result<Vec<Topic>, SyncError> {
        let sql = format!(
            r#"SELECT {} FROM topics
               WHERE id IN (SELECT value FROM json_each(?))
                 AND join_code IN (SELECT topic_join_code FROM topic_members WHERE member_id = ?)
               ORDER BY topic_name"#,
            TOPIC_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(ids_json(ids))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate_topics(rows.iter().map(topic_from_row).collect())
            .await
    }

    /// Question ids linked to a topic, per relationship collection.
    pub async fn topic_question_ids(
        &self,
        join_code: &str,
        kind: QuestionKind,
    ) -> Result<BTreeSet<i64>, SyncError> {
        let sql = format!(
            "SELECT question_id FROM {} WHERE topic_join_code = ?",
            link_table(kind)
        );
        let rows = sqlx::query(&sql)
            .bind(join_code)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("question_id")).collect())
    }

    async fn topic_members(&self, join_code: &str) -> Result<Vec<Member>, SyncError> {
        let rows = sqlx::query(
            r#"SELECT m.id, m.email, m.first_name, m.last_name, m.avatar_url
               FROM members m
               JOIN topic_members tm ON tm.member_id = m.id
               WHERE tm.topic_join_code = ?
               ORDER BY m.id"#,
        )
        .bind(join_code)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(member_from_row).collect())
    }

    async fn hydrate_topics(&self, mut topics: Vec<Topic>) -> Result<Vec<Topic>, SyncError> {
        for topic in &mut topics {
            topic.context_questions = self
                .topic_question_ids(&topic.join_code, QuestionKind::Context)
                .await?;
            topic.request_questions = self
                .topic_question_ids(&topic.join_code, QuestionKind::Request)
                .await?;
            topic.members = self.topic_members(&topic.join_code).await?;
        }
        Ok(topics)
    }

    // ==================== QUESTION QUERIES ====================

    pub async fn list_context_questions(&self) -> Result<Vec<ContextQuestion>, SyncError> {
        let rows = sqlx::query("SELECT id, question, template FROM context_questions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(context_question_from_row).collect())
    }

    pub async fn get_context_question(&self, id: i64) -> Result<Option<ContextQuestion>, SyncError> {
        let row = sqlx::query("SELECT id, question, template FROM context_questions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(context_question_from_row))
    }

    pub async fn get_request_question(&self, id: i64) -> Result<Option<RequestQuestion>, SyncError> {
        let row = sqlx::query("SELECT id, question, template FROM request_questions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(|row| {
            let template: i32 = row.get("template");
            RequestQuestion {
                id: row.get("id"),
                question: row.get("question"),
                template: template != 0,
            }
        }))
    }

    // ==================== RESPONSE QUERIES ====================

    /// Ids of the responses linked to a context question.
    pub async fn question_response_ids(&self, question_id: i64) -> Result<BTreeSet<i64>, SyncError> {
        let rows = sqlx::query("SELECT id FROM context_responses WHERE context_question_id = ?")
            .bind(question_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    /// Get a response with its thread ids.
    pub async fn get_context_response(&self, id: i64) -> Result<Option<ContextResponse>, SyncError> {
        let row = sqlx::query(
            "SELECT id, response, context_question_id FROM context_responses WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(ContextResponse {
            id: row.get("id"),
            response: row.get("response"),
            context_question_id: row.get("context_question_id"),
            threads: self.response_thread_ids(id).await?,
        }))
    }

    /// Ids of the threads linked to a response.
    pub async fn response_thread_ids(&self, response_id: i64) -> Result<BTreeSet<i64>, SyncError> {
        let rows = sqlx::query("SELECT id FROM threads WHERE context_response_id = ?")
            .bind(response_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    pub async fn get_thread(&self, id: i64) -> Result<Option<Thread>, SyncError> {
        let row = sqlx::query("SELECT id, message, context_response_id FROM threads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(|row| Thread {
            id: row.get("id"),
            message: row.get("message"),
            context_response_id: row.get("context_response_id"),
        }))
    }

    // ==================== CONTEXT QUERIES ====================

    pub async fn list_contexts(&self) -> Result<Vec<Context>, SyncError> {
        let rows = sqlx::query("SELECT id, title FROM contexts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| Context {
                id: row.get("id"),
                title: row.get("title"),
            })
            .collect())
    }
}

async fn upsert_topic(
    tx: &mut Transaction<'_, Sqlite>,
    topic: &Topic,
    now: &str,
) -> Result<(), SyncError> {
    sqlx::query(
        r#"INSERT INTO topics (join_code, id, leader_id, topic_name, context_id, synced_at)
           VALUES (?, ?, ?, ?, ?, ?)
           ON CONFLICT(join_code) DO UPDATE SET
               id = COALESCE(excluded.id, topics.id),
               leader_id = excluded.leader_id,
               topic_name = excluded.topic_name,
               context_id = excluded.context_id,
               synced_at = excluded.synced_at"#,
    )
    .bind(&topic.join_code)
    .bind(topic.id)
    .bind(&topic.leader_id)
    .bind(&topic.topic_name)
    .bind(topic.context_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    for member in &topic.members {
        sqlx::query(
            r#"INSERT INTO members (id, email, first_name, last_name, avatar_url)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   email = excluded.email,
                   first_name = excluded.first_name,
                   last_name = excluded.last_name,
                   avatar_url = excluded.avatar_url"#,
        )
        .bind(&member.id)
        .bind(&member.email)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.avatar_url)
        .execute(&mut **tx)
        .await?;

        sqlx::query("INSERT OR IGNORE INTO topic_members (topic_join_code, member_id) VALUES (?, ?)")
            .bind(&topic.join_code)
            .bind(&member.id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

// Helper functions for row conversion

fn link_table(kind: QuestionKind) -> &'static str {
    match kind {
        QuestionKind::Context => "topic_context_questions",
        QuestionKind::Request => "topic_request_questions",
    }
}

fn ids_json(ids: &[i64]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

fn topic_from_row(row: &sqlx::sqlite::SqliteRow) -> Topic {
    Topic {
        id: row.get("id"),
        join_code: row.get("join_code"),
        leader_id: row.get("leader_id"),
        topic_name: row.get("topic_name"),
        context_id: row.get("context_id"),
        context_questions: BTreeSet::new(),
        request_questions: BTreeSet::new(),
        members: Vec::new(),
    }
}

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Member {
    Member {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        avatar_url: row.get("avatar_url"),
    }
}

fn context_question_from_row(row: &sqlx::sqlite::SqliteRow) -> ContextQuestion {
    let template: i32 = row.get("template");
    ContextQuestion {
        id: row.get("id"),
        question: row.get("question"),
        template: template != 0,
    }
}
