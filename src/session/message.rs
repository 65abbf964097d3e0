//! Chat history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blocks::Block;

/// Per-session message identifier. Strictly increasing in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Bot => write!(f, "bot"),
        }
    }
}

/// One chat bubble. Owns its blocks; never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: Sender,
    pub blocks: Vec<Block>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(id: MessageId, sender: Sender, blocks: Vec<Block>) -> Self {
        Self {
            id,
            sender,
            blocks,
            created_at: Utc::now(),
        }
    }

    /// Concatenated markdown content of the top-level blocks.
    pub fn markdown_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Markdown(md) => Some(md.content.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
