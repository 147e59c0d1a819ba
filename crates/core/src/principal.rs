// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Principals (registered users) and the credentials that authenticate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::MessageId;

/// A registered principal as returned by `GET /api/v1/users/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    #[serde(default)]
    pub bio: String,
    /// Highest message id the principal has acknowledged reading.
    ///
    /// Authoritative on the server; the client never lowers it.
    #[serde(rename = "message_height", default)]
    pub unread_watermark: MessageId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: OnlineStatus,
}

/// Liveness as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineStatus {
    pub online: bool,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Username and secret used to authenticate every write.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(rename = "password")]
    pub secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Body of `PUT /api/v1/heartbeat`.
///
/// `message_height` is only present when the heartbeat also acknowledges
/// messages as read.
#[derive(Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_height: Option<MessageId>,
}

impl HeartbeatRequest {
    pub fn liveness(credentials: &Credentials) -> Self {
        HeartbeatRequest {
            username: credentials.username.clone(),
            password: credentials.secret.clone(),
            message_height: None,
        }
    }

    pub fn read_through(credentials: &Credentials, message_id: MessageId) -> Self {
        HeartbeatRequest {
            message_height: Some(message_id),
            ..Self::liveness(credentials)
        }
    }
}

/// Body of `POST /api/v1/users`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub bio: String,
    pub password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("bio", &self.bio)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
#[path = "principal_tests.rs"]
mod tests;
