use serde::{Deserialize, Serialize};

use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One conversational turn. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// What the bootstrap response offered as the seed transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapSeed {
    History(Vec<Message>),
    Reply(String),
}

/// Normalise a history returned by the service before it replaces the local
/// transcript.
///
/// Two passes:
/// 1. `system` messages are dropped.
/// 2. Runs of consecutive `user` messages collapse to their first element.
///
/// The second pass exists because the service echoes the just-sent user
/// message on top of the history it was given, so the newest user turn shows
/// up twice. If that echo ever goes away, this pass becomes a no-op and can be
/// deleted without touching the merge itself.
pub fn normalize_history(history: Vec<Message>) -> Vec<Message> {
    collapse_repeated_user(strip_system(history))
}

fn strip_system(history: Vec<Message>) -> Vec<Message> {
    history
        .into_iter()
        .filter(|m| m.role != Role::System)
        .collect()
}

fn collapse_repeated_user(history: Vec<Message>) -> Vec<Message> {
    let mut kept: Vec<Message> = Vec::with_capacity(history.len());
    for message in history {
        let previous_is_user = kept.last().is_some_and(|m| m.role == Role::User);
        if message.role == Role::User && previous_is_user {
            continue;
        }
        kept.push(message);
    }
    kept
}

/// Ordered local transcript: the last merged server state, optionally
/// followed by one optimistic user message awaiting confirmation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a user message ahead of the round trip.
    ///
    /// Returns the new transcript length; the caller keeps it to check that
    /// the optimistic message is still the tail before rolling back.
    pub fn append_optimistic(&mut self, content: impl Into<String>) -> usize {
        self.messages.push(Message::user(content));
        self.messages.len()
    }

    /// Single-reply form of a response: one assistant message on the tail.
    pub fn append_reply(&mut self, content: impl Into<String>) -> usize {
        self.messages.push(Message::assistant(content));
        self.messages.len()
    }

    /// Replace the transcript with the normalised server history.
    ///
    /// An empty input, or one that normalises to nothing, leaves the
    /// transcript untouched and reports `DegenerateMerge`.
    pub fn merge_server_history(&mut self, server_history: Vec<Message>) -> Result<usize, SyncError> {
        if server_history.is_empty() {
            return Err(SyncError::DegenerateMerge(
                "server returned an empty history".to_string(),
            ));
        }
        let received = server_history.len();
        let normalized = normalize_history(server_history);
        if normalized.is_empty() {
            return Err(SyncError::DegenerateMerge(format!(
                "none of the {received} returned messages are displayable"
            )));
        }
        self.messages = normalized;
        Ok(self.messages.len())
    }

    /// Seed the transcript from the greeting response.
    ///
    /// A full history keeps only its assistant messages; a bare reply becomes
    /// a single assistant message.
    pub fn set_bootstrap_history(&mut self, seed: BootstrapSeed) -> usize {
        self.messages = match seed {
            BootstrapSeed::History(history) => history
                .into_iter()
                .filter(|m| m.role == Role::Assistant)
                .collect(),
            BootstrapSeed::Reply(response) => vec![Message::assistant(response)],
        };
        self.messages.len()
    }

    /// Drop the most recently appended message.
    pub fn rollback_last(&mut self) -> Option<Message> {
        self.messages.pop()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
