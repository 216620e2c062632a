//! Data models for the Topic survey domain.
//!
//! Field names follow the backend's lowercase JSON keys via serde renames.

mod context;
mod member;
mod question;
mod response;
mod topic;

pub use context::*;
pub use member::*;
pub use question::*;
pub use response::*;
pub use topic::*;
