// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Messages of the shared append-only log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the server. Unique and strictly increasing in log order.
pub type MessageId = i64;

/// A message in the shared log. Immutable once created.
///
/// The log is totally ordered by `id`; `created_at` is only used for display
/// because server clocks may disagree with id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender: String,
    pub created_at: DateTime<Utc>,
}

/// A page of messages as returned by `GET /api/v1/messages` (newest first).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
}

/// Query parameters for listing messages.
///
/// `offset` skips the newest `offset` messages, so offset 0 always returns
/// the most recent page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageQuery {
    pub limit: usize,
    pub offset: usize,
}

impl MessageQuery {
    /// Query for the most recent `limit` messages.
    pub fn latest(limit: usize) -> Self {
        MessageQuery { limit, offset: 0 }
    }

    /// Query for the page of `limit` messages starting `offset` back from the newest.
    pub fn page(limit: usize, offset: usize) -> Self {
        MessageQuery { limit, offset }
    }

    /// Query string pairs in the form the server expects.
    pub fn to_pairs(&self) -> [(&'static str, String); 2] {
        [
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ]
    }
}

/// Body of `POST /api/v1/messages`.
#[derive(Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub content: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for NewMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewMessage")
            .field("content", &self.content)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
