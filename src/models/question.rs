//! Question templates that can be attached to topics.

use serde::{Deserialize, Serialize};

/// A context question; owns the responses given to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextQuestion {
    pub id: i64,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub template: bool,
}

/// A request question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestQuestion {
    pub id: i64,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub template: bool,
}

/// Which relationship collection of a topic a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    Context,
    Request,
}

impl QuestionKind {
    /// Resource path of a single question of this kind.
    pub fn path(&self, id: i64) -> String {
        match self {
            QuestionKind::Context => format!("contextquestion/{}", id),
            QuestionKind::Request => format!("requestQuestion/{}", id),
        }
    }
}
