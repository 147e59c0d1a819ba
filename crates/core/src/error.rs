// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for atrium-core operations.

use thiserror::Error;

/// All possible errors that can occur in atrium-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid store key: '{0}'\n  hint: keys are lowercase letters, digits, '-' and '_'")]
    InvalidKey(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("no data directory available\n  hint: pass --data-dir or set ATRIUM_DATA_DIR")]
    NoDataDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}

/// A specialized Result type for atrium-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
