//! Conversation thread state and its checkpoint stores

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod store;

pub use store::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};

/// Default maximum number of messages kept per thread
pub const DEFAULT_MAX_MESSAGES: usize = 100;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint for thread '{thread_id}' is corrupt: {source}")]
    Corrupt {
        thread_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode checkpoint: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Persisted history of one conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub thread_id: String,
    pub messages: Vec<TurnMessage>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

fn default_max_messages() -> usize {
    DEFAULT_MAX_MESSAGES
}

/// A stored user or assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMessage {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl SessionState {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self::with_max_messages(thread_id, DEFAULT_MAX_MESSAGES)
    }

    pub fn with_max_messages(thread_id: impl Into<String>, max_messages: usize) -> Self {
        let now = Local::now();
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            max_messages,
        }
    }

    pub fn add_message(&mut self, role: impl Into<String>, content: impl Into<String>) {
        let now = Local::now();
        self.messages.push(TurnMessage {
            role: role.into(),
            content: content.into(),
            timestamp: now,
        });
        self.updated_at = now;
        self.enforce_max_messages();
    }

    /// Record one completed turn
    pub fn record_turn(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.add_message("user", user);
        self.add_message("assistant", assistant);
    }

    /// Drop the oldest messages beyond `max_messages`
    fn enforce_max_messages(&mut self) {
        if self.messages.len() > self.max_messages {
            let to_remove = self.messages.len() - self.max_messages;
            self.messages.drain(0..to_remove);
            debug!(
                "Thread {} truncated to {} messages",
                self.thread_id,
                self.messages.len()
            );
        }
    }

    /// The last `max_messages` messages as engine input
    pub fn history(&self, max_messages: usize) -> Vec<nimbus_provider::Message> {
        self.messages
            .iter()
            .skip(self.messages.len().saturating_sub(max_messages))
            .map(|m| match m.role.as_str() {
                "assistant" => nimbus_provider::Message::assistant(m.content.clone()),
                "system" => nimbus_provider::Message::system(m.content.clone()),
                _ => nimbus_provider::Message::user(m.content.clone()),
            })
            .collect()
    }

    pub fn set_max_messages(&mut self, max_messages: usize) {
        self.max_messages = max_messages;
        self.enforce_max_messages();
    }
}
