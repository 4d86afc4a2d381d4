use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single role-tagged message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered conversation history for one session.
///
/// Turns strictly alternate starting with a user turn. The transcript lives
/// in memory for the process lifetime and is never written to disk.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a user turn. Fails if the previous turn is also a user turn.
    pub fn push_user(&mut self, content: impl Into<String>) -> Result<(), ChatError> {
        if let Some(last) = self.turns.last() {
            if last.role == Role::User {
                return Err(ChatError::Transcript(
                    "consecutive user turns are not allowed".into(),
                ));
            }
        }
        self.turns.push(Turn::user(content));
        Ok(())
    }

    /// Append an assistant turn. Fails unless the previous turn is a user turn.
    pub fn push_assistant(&mut self, content: impl Into<String>) -> Result<(), ChatError> {
        match self.turns.last() {
            Some(last) if last.role == Role::User => {
                self.turns.push(Turn::assistant(content));
                Ok(())
            }
            _ => Err(ChatError::Transcript(
                "assistant turn must follow a user turn".into(),
            )),
        }
    }

    /// Remove and return the most recent turn. Used to roll back a user turn
    /// when the generation call for it failed.
    pub fn pop_last(&mut self) -> Option<Turn> {
        self.turns.pop()
    }

    /// Discard all turns.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
