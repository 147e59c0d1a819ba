// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod auth;
pub mod history;
pub mod read;
pub mod send;
pub mod status;
pub mod watch;

use std::io::BufRead;
use std::sync::Arc;

use atrium_client::{HttpRemote, Mode, SessionCoordinator};
use atrium_core::config::default_data_dir;
use atrium_core::{ClientConfig, FileStore};

use crate::cli::{CredentialArgs, GlobalArgs};
use crate::error::{Error, Result};

/// Everything a command needs: resolved config and a coordinator.
pub struct Context {
    pub config: ClientConfig,
    pub coordinator: SessionCoordinator,
}

impl Context {
    /// Resolve the data dir and config, and wire the coordinator.
    ///
    /// Does not touch the network.
    pub fn open(global: &GlobalArgs) -> Result<Self> {
        let data_dir = match &global.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        let mut config = ClientConfig::load(&data_dir)?;
        if let Some(server) = &global.server {
            config.server_url = server.clone();
            config.validate()?;
        }
        tracing::debug!(data_dir = %data_dir.display(), server = %config.server_url, "opening client");

        let store = FileStore::open(&data_dir)?;
        let remote = HttpRemote::new(&config.server_url, config.request_timeout())?;
        let coordinator = SessionCoordinator::new(Arc::new(remote), Arc::new(store), &config);
        Ok(Context {
            config,
            coordinator,
        })
    }

    /// Restore the persisted session and wait for the background login.
    ///
    /// Returns the resulting mode; an unreachable server leaves it offline.
    pub async fn restore(&self) -> Result<Mode> {
        let restore = self.coordinator.restore_session();
        match restore.reconnect {
            Some(reconnect) => Ok(reconnect.await?),
            None => Ok(restore.mode),
        }
    }
}

/// Password from the flag or environment, else one line from stdin.
pub fn resolve_password(args: CredentialArgs) -> Result<String> {
    if let Some(password) = args.password {
        return Ok(password);
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(Error::PasswordRequired);
    }
    Ok(password)
}
