// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! atrium_cli - command line front end for the Atrium message board.
//!
//! A thin shell over [`atrium_client::SessionCoordinator`]: every command
//! restores the persisted session, lets the coordinator reconcile with the
//! server, performs one action and prints the result.
//!
//! # Main Components
//!
//! - [`Cli`] - argument parsing
//! - [`run`] - command dispatch on a Tokio runtime
//! - [`Error`] - user-facing errors with hints

mod cli;
mod commands;
mod display;
mod logging;

pub mod error;

pub use cli::{Cli, Command, CredentialArgs, GlobalArgs, OutputFormat};
pub use error::{Error, Result};

/// Execute a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    logging::setup_logging(cli.global.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dispatch(cli))
}

async fn dispatch(cli: Cli) -> Result<()> {
    let ctx = commands::Context::open(&cli.global)?;
    match cli.command {
        Command::Login {
            username,
            credentials,
            register,
            bio,
        } => commands::auth::login(&ctx, &username, credentials, register, &bio).await,
        Command::Register {
            username,
            credentials,
            bio,
        } => commands::auth::register(&ctx, &username, credentials, &bio).await,
        Command::Logout => commands::auth::logout(&ctx),
        Command::Status { output } => commands::status::run(&ctx, output).await,
        Command::History {
            older,
            limit,
            output,
        } => commands::history::run(&ctx, older, limit, output).await,
        Command::Send { text } => commands::send::run(&ctx, &text).await,
        Command::Read => commands::read::run(&ctx).await,
        Command::Watch { backlog } => commands::watch::run(&ctx, backlog).await,
    }
}
