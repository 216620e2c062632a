//! Default survey contexts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Context {
    pub id: i64,
    #[serde(default)]
    pub title: String,
}
