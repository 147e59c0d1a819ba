// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is stored in `<data dir>/config.toml`. Every field has a
//! default, so a missing file or a partial file is valid:
//!
//! ```toml
//! server_url = "http://localhost:3000"
//!
//! [heartbeat]
//! interval_ms = 30000
//! max_failures = 3
//! backoff_ms = [1000, 2000, 5000, 10000, 30000]
//!
//! [sync]
//! page_size = 50
//! cache_limit = 1000
//! memory_limit = 5000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "config.toml";
const DATA_DIR_NAME: &str = "atrium";

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the Atrium server.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Timeout applied to every request in milliseconds (default: 10000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Presence heartbeat timing and fail-stop policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Interval between heartbeats while healthy (default: 30000).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub interval_ms: u64,
    /// Consecutive failures after which the heartbeat stops itself (default: 3).
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    /// Explicit retry delay per consecutive failure, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: Vec<u64>,
    /// Hard ceiling for retry delays once the table is exhausted (default: 30000).
    #[serde(default = "default_backoff_ceiling_ms")]
    pub backoff_ceiling_ms: u64,
}

/// Message sync paging, polling and cache policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Messages per page for initial, older and incremental fetches (default: 50).
    ///
    /// An incremental poll only observes the newest `page_size` messages, so
    /// more than `page_size` arrivals between two polls leave a gap.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Most recent messages kept in the persisted cache (default: 1000).
    #[serde(default = "default_cache_limit")]
    pub cache_limit: usize,
    /// Most messages held in memory once polls grow the cache (default: 5000).
    ///
    /// A poll that pushes the cache past this drops the oldest messages;
    /// `load_older` can fetch them again.
    #[serde(default = "default_memory_limit")]
    pub memory_limit: usize,
    /// Interval between incremental polls while online (default: 5000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Extra pages an incremental poll may fetch to close a detected gap (default: 0).
    #[serde(default)]
    pub gap_backfill_pages: usize,
}

fn default_server_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_max_failures() -> u32 {
    3
}

fn default_backoff_ms() -> Vec<u64> {
    vec![1_000, 2_000, 5_000, 10_000, 30_000]
}

fn default_backoff_ceiling_ms() -> u64 {
    30_000
}

fn default_page_size() -> usize {
    50
}

fn default_cache_limit() -> usize {
    1000
}

fn default_memory_limit() -> usize {
    5000
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: default_server_url(),
            request_timeout_ms: default_request_timeout_ms(),
            heartbeat: HeartbeatConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        HeartbeatConfig {
            interval_ms: default_heartbeat_interval_ms(),
            max_failures: default_max_failures(),
            backoff_ms: default_backoff_ms(),
            backoff_ceiling_ms: default_backoff_ceiling_ms(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            page_size: default_page_size(),
            cache_limit: default_cache_limit(),
            memory_limit: default_memory_limit(),
            poll_interval_ms: default_poll_interval_ms(),
            gap_backfill_pages: 0,
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Delay before retrying after `failures` consecutive failures (1-based).
    ///
    /// Uses the explicit table while it lasts, then doubles the last table
    /// entry per extra failure. Never exceeds the ceiling.
    pub fn retry_delay(&self, failures: u32) -> Duration {
        let ceiling = self.backoff_ceiling_ms;
        let index = failures.saturating_sub(1) as usize;

        let ms = match self.backoff_ms.get(index) {
            Some(&ms) => ms,
            None => {
                let mut ms = self.backoff_ms.last().copied().unwrap_or(ceiling);
                let extra = index + 1 - self.backoff_ms.len();
                for _ in 0..extra {
                    ms = ms.saturating_mul(2);
                    if ms >= ceiling {
                        break;
                    }
                }
                ms
            }
        };

        Duration::from_millis(ms.min(ceiling))
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Loads the config from `<data_dir>/config.toml`.
    ///
    /// A missing file yields the defaults.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let config = match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ClientConfig::default(),
            Err(e) => return Err(e.into()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Saves the config to `<data_dir>/config.toml`.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        self.validate()?;
        fs::create_dir_all(data_dir)?;
        let content = toml::to_string_pretty(self)?;
        fs::write(data_dir.join(CONFIG_FILE_NAME), content)?;
        Ok(())
    }

    /// Rejects values the client cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "server_url '{}' must start with http:// or https://",
                self.server_url
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        if self.heartbeat.interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "heartbeat.interval_ms must be positive".to_string(),
            ));
        }
        if self.heartbeat.max_failures == 0 {
            return Err(Error::InvalidConfig(
                "heartbeat.max_failures must be at least 1".to_string(),
            ));
        }
        if self.heartbeat.backoff_ms.is_empty() {
            return Err(Error::InvalidConfig(
                "heartbeat.backoff_ms needs at least one delay".to_string(),
            ));
        }
        if self.sync.page_size == 0 {
            return Err(Error::InvalidConfig(
                "sync.page_size must be positive".to_string(),
            ));
        }
        if self.sync.cache_limit == 0 {
            return Err(Error::InvalidConfig(
                "sync.cache_limit must be positive".to_string(),
            ));
        }
        if self.sync.memory_limit < self.sync.cache_limit {
            return Err(Error::InvalidConfig(format!(
                "sync.memory_limit ({}) must not be below sync.cache_limit ({})",
                self.sync.memory_limit, self.sync.cache_limit
            )));
        }
        if self.sync.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "sync.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Platform data directory for the client (e.g. `~/.local/share/atrium`).
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .ok_or(Error::NoDataDir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
