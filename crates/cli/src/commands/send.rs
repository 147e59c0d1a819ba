// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::display::format_message;
use crate::error::Result;

use super::Context;

pub async fn run(ctx: &Context, text: &str) -> Result<()> {
    ctx.restore().await?;
    let message = ctx.coordinator.send(text).await?;
    println!("{}", format_message(&message));
    Ok(())
}
