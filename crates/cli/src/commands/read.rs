// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::Result;

use super::Context;

pub async fn run(ctx: &Context) -> Result<()> {
    ctx.restore().await?;
    match ctx.coordinator.mark_all_read().await? {
        Some(watermark) => println!("marked read through #{}", watermark),
        None => println!("nothing new to mark read"),
    }
    Ok(())
}
