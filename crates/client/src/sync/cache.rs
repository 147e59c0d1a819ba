// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered, deduplicated in-memory message cache.

use atrium_core::{Message, MessageId};

/// Messages sorted ascending by id with no duplicate ids.
///
/// Id order is canonical; `created_at` never participates in ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageCache {
    messages: Vec<Message>,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from messages in any order.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let mut cache = MessageCache::new();
        cache.merge(messages);
        cache
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Highest cached id, 0 when empty.
    pub fn latest_id(&self) -> MessageId {
        self.messages.last().map(|m| m.id).unwrap_or(0)
    }

    pub fn earliest_id(&self) -> Option<MessageId> {
        self.messages.first().map(|m| m.id)
    }

    /// Replace the whole cache with `page`.
    pub fn replace(&mut self, page: Vec<Message>) {
        self.messages.clear();
        self.merge(page);
    }

    /// Insert messages whose ids are not cached yet.
    ///
    /// Already cached messages win over incoming copies. Returns the number
    /// of messages added.
    pub fn merge(&mut self, mut page: Vec<Message>) -> usize {
        let before = self.messages.len();
        let latest = self.latest_id();
        if !self.messages.is_empty() && page.iter().all(|m| m.id > latest) {
            // Everything is newer: only the page itself needs ordering.
            page.sort_by_key(|m| m.id);
            page.dedup_by_key(|m| m.id);
            self.messages.extend(page);
        } else {
            self.messages.extend(page);
            // Stable sort keeps the cached copy ahead of an incoming duplicate.
            self.messages.sort_by_key(|m| m.id);
            self.messages.dedup_by_key(|m| m.id);
        }
        self.messages.len() - before
    }

    /// Drop the oldest messages so at most `limit` remain.
    ///
    /// Returns the number dropped.
    pub fn retain_recent(&mut self, limit: usize) -> usize {
        let excess = self.messages.len().saturating_sub(limit);
        self.messages.drain(..excess);
        excess
    }

    /// The most recent `limit` messages.
    pub fn recent(&self, limit: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }

    /// Number of cached messages above `watermark`.
    pub fn unread_after(&self, watermark: MessageId) -> usize {
        let first_unread = self.messages.partition_point(|m| m.id <= watermark);
        self.messages.len() - first_unread
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
