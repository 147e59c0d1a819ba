// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use atrium_client::{RemoteError, SessionError};
use thiserror::Error;

/// Errors surfaced by the `atrium` command line.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Core(#[from] atrium_core::Error),

    #[error("cannot reach server: {0}")]
    Remote(#[from] RemoteError),

    #[error("password required\n  hint: pass --password or set ATRIUM_PASSWORD")]
    PasswordRequired,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A specialized Result type for command execution.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
