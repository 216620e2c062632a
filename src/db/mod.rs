//! Local store for the synced topic graph.
//!
//! SQLite holds the local copy; the backend stays the source of truth.

mod changeset;
mod repository;

pub use changeset::*;
pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = [
        // Topics are keyed by join code; the server id arrives after creation.
        r#"
        CREATE TABLE IF NOT EXISTS topics (
            join_code TEXT PRIMARY KEY,
            id INTEGER,
            leader_id TEXT NOT NULL,
            topic_name TEXT NOT NULL,
            context_id INTEGER NOT NULL,
            synced_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS context_questions (
            id INTEGER PRIMARY KEY,
            question TEXT NOT NULL,
            template INTEGER NOT NULL DEFAULT 0,
            synced_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS request_questions (
            id INTEGER PRIMARY KEY,
            question TEXT NOT NULL,
            template INTEGER NOT NULL DEFAULT 0,
            synced_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS topic_context_questions (
            topic_join_code TEXT NOT NULL REFERENCES topics(join_code) ON DELETE CASCADE,
            question_id INTEGER NOT NULL,
            PRIMARY KEY (topic_join_code, question_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS topic_request_questions (
            topic_join_code TEXT NOT NULL REFERENCES topics(join_code) ON DELETE CASCADE,
            question_id INTEGER NOT NULL,
            PRIMARY KEY (topic_join_code, question_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS context_responses (
            id INTEGER PRIMARY KEY,
            response TEXT NOT NULL,
            context_question_id INTEGER,
            synced_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS threads (
            id INTEGER PRIMARY KEY,
            message TEXT NOT NULL,
            context_response_id INTEGER,
            synced_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS contexts (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            synced_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id TEXT PRIMARY KEY,
            email TEXT,
            first_name TEXT,
            last_name TEXT,
            avatar_url TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS topic_members (
            topic_join_code TEXT NOT NULL REFERENCES topics(join_code) ON DELETE CASCADE,
            member_id TEXT NOT NULL,
            PRIMARY KEY (topic_join_code, member_id)
        )
        "#,
        // Indexes for common queries
        "CREATE INDEX IF NOT EXISTS idx_topics_id ON topics(id)",
        "CREATE INDEX IF NOT EXISTS idx_topics_leader_id ON topics(leader_id)",
        "CREATE INDEX IF NOT EXISTS idx_responses_question ON context_responses(context_question_id)",
        "CREATE INDEX IF NOT EXISTS idx_threads_response ON threads(context_response_id)",
        "CREATE INDEX IF NOT EXISTS idx_topic_members_member ON topic_members(member_id)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
