// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::CredentialArgs;
use crate::error::Result;

use super::{resolve_password, Context};

pub async fn login(
    ctx: &Context,
    username: &str,
    credentials: CredentialArgs,
    register: bool,
    bio: &str,
) -> Result<()> {
    let password = resolve_password(credentials)?;
    let session = if register {
        ctx.coordinator
            .login_or_register(username, &password, bio)
            .await?
    } else {
        ctx.coordinator.login(username, password).await?
    };
    println!(
        "logged in as {} ({} unread)",
        session.principal.name,
        ctx.coordinator.unread_count()
    );
    Ok(())
}

pub async fn register(
    ctx: &Context,
    username: &str,
    credentials: CredentialArgs,
    bio: &str,
) -> Result<()> {
    let password = resolve_password(credentials)?;
    let principal = ctx.coordinator.register(username, &password, bio).await?;
    ctx.coordinator.login(username, password).await?;
    println!("registered and logged in as {}", principal.name);
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    ctx.coordinator.logout()?;
    println!("logged out");
    Ok(())
}
