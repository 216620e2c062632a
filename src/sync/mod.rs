//! Synchronization pipeline between the backend and the local store.
//!
//! Every operation reports exactly one terminal outcome. Failures of single
//! children inside a fan-out (one question, one link POST) are logged and
//! collected into the returned report instead of failing the operation.

pub mod barrier;
pub mod fanout;

mod catalog;
mod create;
mod ingest;
mod reconcile;

use std::collections::BTreeSet;

use serde::Serialize;
use tokio::runtime::Handle;

use crate::db::Repository;
use crate::errors::ChildFailure;
use crate::models::TopicQuestion;
use crate::remote::RemoteClient;

/// Outcome of a topic ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Join codes of the topics saved locally
    pub synced: Vec<String>,
    /// Join codes of local topics removed because the server no longer lists them
    pub removed: Vec<String>,
    pub failures: Vec<ChildFailure>,
}

/// Outcome of linking questions to a topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkReport {
    /// Links the backend accepted
    pub linked: Vec<TopicQuestion>,
    pub failures: Vec<ChildFailure>,
}

/// Outcome of fetching a list of child records by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchReport {
    pub fetched: BTreeSet<i64>,
    pub failures: Vec<ChildFailure>,
}

/// The sync engine: a remote client, a local repository and the runtime
/// handle barrier completions are dispatched on.
#[derive(Clone)]
pub struct TopicSync {
    remote: RemoteClient,
    repo: Repository,
    handle: Handle,
}

impl TopicSync {
    pub fn new(remote: RemoteClient, repo: Repository, handle: Handle) -> Self {
        Self {
            remote,
            repo,
            handle,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn remote(&self) -> &RemoteClient {
        &self.remote
    }
}
