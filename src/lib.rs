//! Topic Sync
//!
//! Keeps a local SQLite copy of a survey backend's topics, questions,
//! responses and threads in step with the server.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod remote;
pub mod sync;

pub use errors::{Result, SyncError};
pub use sync::{FetchReport, LinkReport, SyncReport, TopicSync};

#[cfg(test)]
mod tests;
