// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Live transcript: prints messages as polls bring them in.

use atrium_client::{Mode, SessionError};
use atrium_core::MessageId;

use crate::display::{format_message, format_mode_change};
use crate::error::Result;

use super::Context;

pub async fn run(ctx: &Context, backlog: usize) -> Result<()> {
    let mode = ctx.restore().await?;
    if mode == Mode::Unauthenticated {
        return Err(SessionError::NotLoggedIn.into());
    }
    eprintln!("{}", format_mode_change(mode));

    let coordinator = &ctx.coordinator;
    let mut states = coordinator.engine().subscribe();
    let mut modes = coordinator.subscribe_mode();
    let retry_interval = ctx.config.heartbeat.interval();

    let mut printed: MessageId = {
        let state = states.borrow_and_update();
        for message in state.cache.recent(backlog) {
            println!("{}", format_message(message));
        }
        state.cache.latest_id()
    };

    loop {
        let offline = *modes.borrow() == Mode::Offline;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let fresh: Vec<_> = states
                    .borrow_and_update()
                    .cache
                    .iter()
                    .filter(|m| m.id > printed)
                    .cloned()
                    .collect();
                for message in fresh {
                    println!("{}", format_message(&message));
                    printed = printed.max(message.id);
                }
            }
            changed = modes.changed() => {
                if changed.is_err() {
                    break;
                }
                let mode = *modes.borrow_and_update();
                eprintln!("{}", format_mode_change(mode));
                if mode == Mode::Unauthenticated {
                    return Err(SessionError::NotLoggedIn.into());
                }
            }
            _ = tokio::time::sleep(retry_interval), if offline => {
                match coordinator.reconnect().await {
                    Ok(mode) => tracing::debug!(%mode, "reconnect attempt finished"),
                    Err(e) => tracing::debug!("reconnect failed: {}", e),
                }
            }
        }
    }
    Ok(())
}
