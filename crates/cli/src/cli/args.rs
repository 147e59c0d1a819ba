// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared argument structs for CLI commands.

use std::path::PathBuf;

use clap::Args;

use super::vars;

/// Options accepted by every command.
#[derive(Args, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// Directory holding config.toml, the session and the message cache
    #[arg(long, global = true, env = vars::ATRIUM_DATA_DIR, value_name = "path")]
    pub data_dir: Option<PathBuf>,

    /// Server base URL, overriding config.toml
    #[arg(long, global = true, env = vars::ATRIUM_SERVER, value_name = "url")]
    pub server: Option<String>,

    /// Log more (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Password for commands that authenticate.
#[derive(Args, Clone, Debug, Default)]
pub struct CredentialArgs {
    /// Password; read from stdin when omitted
    #[arg(long, env = vars::ATRIUM_PASSWORD, hide_env_values = true)]
    pub password: Option<String>,
}
