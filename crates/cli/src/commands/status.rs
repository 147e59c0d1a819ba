// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::OutputFormat;
use crate::display::{format_presence, StatusReport};
use crate::error::Result;

use super::Context;

pub async fn run(ctx: &Context, output: OutputFormat) -> Result<()> {
    let mode = ctx.restore().await?;
    let coordinator = &ctx.coordinator;
    let session = coordinator.session();
    let state = coordinator.engine().state();

    let report = StatusReport {
        mode: mode.to_string(),
        username: session.as_ref().map(|s| s.principal.name.clone()),
        presence: format_presence(&coordinator.presence().state()),
        cached: state.cache.len(),
        unread: coordinator.unread_count(),
        watermark: session
            .as_ref()
            .map(|s| s.principal.unread_watermark)
            .unwrap_or(0),
        last_error: state.error.as_ref().map(|e| e.to_string()),
    };

    match output {
        OutputFormat::Text => println!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
