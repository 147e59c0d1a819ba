// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use clap::{Parser, Subcommand, ValueEnum};

pub use args::{CredentialArgs, GlobalArgs};

/// Environment variable names read by the CLI.
pub mod vars {
    pub const ATRIUM_DATA_DIR: &str = "ATRIUM_DATA_DIR";
    pub const ATRIUM_SERVER: &str = "ATRIUM_SERVER";
    pub const ATRIUM_PASSWORD: &str = "ATRIUM_PASSWORD";
}

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "atrium")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Read and post to an Atrium message board from the terminal")]
#[command(
    long_about = "Read and post to an Atrium message board from the terminal.\n\n\
    Messages are cached locally so history stays readable while the server is unreachable."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and remember the session
    #[command(after_help = "\
Examples:
  atrium login ana                     Prompt for the password on stdin
  atrium login ana --password s3cret   Pass the password inline
  atrium login ana --register          Create the account if it does not exist")]
    Login {
        username: String,

        #[command(flatten)]
        credentials: CredentialArgs,

        /// Register the account first if the server does not know it
        #[arg(long)]
        register: bool,

        /// Profile bio used when registering
        #[arg(long, default_value = "")]
        bio: String,
    },

    /// Create an account and log in
    Register {
        username: String,

        #[command(flatten)]
        credentials: CredentialArgs,

        /// Profile bio
        #[arg(long, default_value = "")]
        bio: String,
    },

    /// Forget the session and the local message cache
    Logout,

    /// Show session, connectivity and unread state
    Status {
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Print cached messages, refreshing them when online
    #[command(after_help = "\
Examples:
  atrium history               Newest page of messages
  atrium history --older 2     Also page back twice
  atrium history -o json       Machine-readable output")]
    History {
        /// Number of older pages to fetch before printing
        #[arg(long, default_value_t = 0)]
        older: usize,

        /// Only print the most recent N messages
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Post a message
    Send {
        #[arg(value_parser = non_empty_string)]
        text: String,
    },

    /// Mark every cached message as read
    Read,

    /// Stay online and print new messages until interrupted
    Watch {
        /// Messages of backlog to print on start
        #[arg(long, short = 'n', default_value_t = 20)]
        backlog: usize,
    },
}

#[cfg(test)]
#[path = "../cli_tests.rs"]
mod tests;
