// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use atrium_client::{Mode, SessionError};

use crate::cli::OutputFormat;
use crate::display::{format_fault, format_message};
use crate::error::Result;

use super::Context;

pub async fn run(
    ctx: &Context,
    older: usize,
    limit: Option<usize>,
    output: OutputFormat,
) -> Result<()> {
    let mode = ctx.restore().await?;
    if mode == Mode::Unauthenticated {
        return Err(SessionError::NotLoggedIn.into());
    }

    let engine = ctx.coordinator.engine();
    if mode == Mode::Online {
        for _ in 0..older {
            if !engine.load_older().await {
                break;
            }
        }
    }

    let state = engine.state();
    let messages = match limit {
        Some(limit) => state.cache.recent(limit),
        None => state.cache.as_slice(),
    };

    match output {
        OutputFormat::Text => {
            if let Some(fault) = &state.error {
                eprintln!("{}", format_fault(fault));
            }
            if messages.is_empty() {
                println!("No messages");
            }
            for message in messages {
                println!("{}", format_message(message));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(messages)?),
    }
    Ok(())
}
