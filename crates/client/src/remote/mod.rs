// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Boundary to the Atrium server.
//!
//! Provides a trait-based remote layer that enables:
//! - Real HTTP access for production ([`HttpRemote`])
//! - In-memory fakes for unit testing

mod http;

use std::future::Future;
use std::pin::Pin;

use atrium_core::{
    Credentials, HeartbeatRequest, Message, MessageQuery, OnlineStatus, Principal, Registration,
};

pub use http::HttpRemote;

/// Error type for remote operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Request never produced a response (connect, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// Server rejected the credentials.
    #[error("credentials rejected: {0}")]
    Auth(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("server returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Network(_) => true,
            RemoteError::Api { status, .. } => *status >= 500,
            RemoteError::Auth(_) | RemoteError::NotFound(_) | RemoteError::Malformed(_) => false,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, RemoteError::Auth(_))
    }
}

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Boxed future returned by [`Remote`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = RemoteResult<T>> + Send + 'a>>;

/// Operations the client needs from the server.
///
/// This trait abstracts over the actual transport so the sync engine,
/// heartbeat and session coordinator can be tested without a server.
pub trait Remote: Send + Sync {
    /// List a page of messages, newest first.
    fn list_messages(&self, query: MessageQuery) -> RemoteFuture<'_, Vec<Message>>;

    /// Create a message authored by `credentials.username`.
    fn create_message(&self, credentials: Credentials, content: String)
        -> RemoteFuture<'_, Message>;

    /// Assert liveness, optionally acknowledging messages as read.
    fn heartbeat(&self, request: HeartbeatRequest) -> RemoteFuture<'_, OnlineStatus>;

    /// Fetch a principal's public profile.
    fn get_principal(&self, username: String) -> RemoteFuture<'_, Principal>;

    /// Register a new principal.
    fn register(&self, registration: Registration) -> RemoteFuture<'_, Principal>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
