//! Topic Sync CLI
//!
//! Drives the sync pipeline against the configured backend and prints the
//! outcome as JSON.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::runtime::Handle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use topic_sync::auth::StaticCredentials;
use topic_sync::config::Config;
use topic_sync::db::{self, Repository};
use topic_sync::models::{ContextQuestion, RequestQuestion};
use topic_sync::remote::RemoteClient;
use topic_sync::{SyncError, TopicSync};

#[derive(Parser)]
#[command(name = "topic-sync")]
#[command(version)]
#[command(about = "Sync survey topics between the backend and a local store")]
#[command(after_long_help = r#"ENVIRONMENT VARIABLES
    TOPIC_SYNC_BASE_URL       Backend base URL (default: http://127.0.0.1:8080/api/)
    TOPIC_SYNC_DB_PATH        SQLite database path (default: ./data/topics.sqlite)
    TOPIC_SYNC_LOG_LEVEL      Log level when RUST_LOG is unset (default: info)
    TOPIC_SYNC_TOKEN          Bearer token
    TOPIC_SYNC_USER_ID        Id of the signed-in user
    TOPIC_SYNC_TIMEOUT_SECS   Per-request timeout (default: 30)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every topic with its questions
    Sync,
    /// Refresh the local store down to the topic with this join code
    Join { join_code: String },
    /// Create a topic and link locally known questions to it
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        context_id: i64,
        #[arg(long = "context-question")]
        context_questions: Vec<i64>,
        #[arg(long = "request-question")]
        request_questions: Vec<i64>,
    },
    /// Delete a topic you lead, remotely and locally
    Delete { join_code: String },
    /// Fetch the default contexts
    Contexts,
    /// Fetch the template context questions
    ContextQuestions,
    /// List responses, or fetch and link some to a question
    Responses {
        #[arg(long, requires = "ids")]
        question: Option<i64>,
        #[arg(long = "id")]
        ids: Vec<i64>,
    },
    /// Fetch threads and link them to a response
    Threads {
        #[arg(long)]
        response: i64,
        #[arg(long = "id", required = true)]
        ids: Vec<i64>,
    },
    /// Print the locally stored topics
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::from_env();

    // Logs go to stderr so stdout stays JSON
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Database path: {:?}", config.db_path);
    tracing::debug!("Backend: {}", config.base_url);

    let pool = db::init_database(&config.db_path).await?;
    let repo = Repository::new(pool);

    let credentials = Arc::new(StaticCredentials::from_config(&config));
    let remote = RemoteClient::new(&config.base_url, config.request_timeout, credentials)?;
    let engine = TopicSync::new(remote, repo, Handle::current());

    run(&engine, &config, cli.command).await?;
    Ok(())
}

async fn run(engine: &TopicSync, config: &Config, command: Commands) -> topic_sync::Result<()> {
    match command {
        Commands::Sync => print(&engine.get_topics().await?),
        Commands::Join { join_code } => print(&engine.get_topic(&join_code).await?),
        Commands::Create {
            name,
            context_id,
            context_questions,
            request_questions,
        } => {
            let (context_questions, request_questions) =
                load_questions(engine, &context_questions, &request_questions).await?;
            let join_code = engine
                .post_topic(&name, context_id, &context_questions, &request_questions)
                .await?;
            print(&serde_json::json!({ "joinCode": join_code }))
        }
        Commands::Delete { join_code } => {
            let topic = engine
                .repository()
                .get_topic_by_join_code(&join_code)
                .await?
                .ok_or_else(|| SyncError::NotFound(format!("Join code {}", join_code)))?;

            match &config.user_id {
                Some(user_id) if *user_id == topic.leader_id => {}
                Some(_) => {
                    return Err(SyncError::BadRequest(format!(
                        "Only the leader can delete topic {}",
                        join_code
                    )))
                }
                None => return Err(SyncError::NotAuthenticated),
            }

            engine.delete_topic(&topic).await?;
            engine.delete_local_topics(std::slice::from_ref(&topic)).await?;
            print(&serde_json::json!({ "deleted": join_code }))
        }
        Commands::Contexts => print(&engine.get_default_contexts().await?),
        Commands::ContextQuestions => print(&engine.get_default_context_questions().await?),
        Commands::Responses { question, ids } => match question {
            Some(question_id) => print(&engine.get_context_responses(question_id, &ids).await?),
            None => print(&engine.list_context_responses().await?),
        },
        Commands::Threads { response, ids } => print(&engine.get_threads(response, &ids).await?),
        Commands::List => print(&engine.repository().list_topics().await?),
    }
}

/// Resolve question ids against the local store; unknown ids are an error.
async fn load_questions(
    engine: &TopicSync,
    context_ids: &[i64],
    request_ids: &[i64],
) -> topic_sync::Result<(Vec<ContextQuestion>, Vec<RequestQuestion>)> {
    let repo = engine.repository();

    let mut context_questions = Vec::with_capacity(context_ids.len());
    for &id in context_ids {
        let question = repo
            .get_context_question(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("Context question {}", id)))?;
        context_questions.push(question);
    }

    let mut request_questions = Vec::with_capacity(request_ids.len());
    for &id in request_ids {
        let question = repo
            .get_request_question(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("Request question {}", id)))?;
        request_questions.push(question);
    }

    Ok((context_questions, request_questions))
}

fn print<T: Serialize>(value: &T) -> topic_sync::Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{}", out);
    Ok(())
}
