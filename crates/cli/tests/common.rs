// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Nothing listens here, so every request fails fast with a network error.
pub const UNREACHABLE_SERVER: &str = "http://127.0.0.1:9";

/// `atrium` bound to `data_dir` and an unreachable server.
pub fn atrium(data_dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("atrium");
    cmd.env_remove("ATRIUM_PASSWORD")
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--server")
        .arg(UNREACHABLE_SERVER);
    cmd
}

/// Write a session for `ana` with `count` cached messages, as a previous
/// login would have left it.
pub fn seed_session(data_dir: &Path, count: i64) {
    fs::create_dir_all(data_dir).unwrap();
    let identity = serde_json::json!({
        "name": "ana",
        "bio": "",
        "message_height": 1,
        "created_at": "2026-01-01T00:00:00Z",
    });
    fs::write(data_dir.join("identity.json"), identity.to_string()).unwrap();
    fs::write(data_dir.join("secret.json"), "\"pw\"").unwrap();

    let messages: Vec<_> = (1..=count)
        .map(|id| {
            serde_json::json!({
                "id": id,
                "content": format!("message {}", id),
                "sender": "ana",
                "created_at": "2026-01-01T00:00:00Z",
            })
        })
        .collect();
    fs::write(
        data_dir.join("messages.json"),
        serde_json::Value::Array(messages).to_string(),
    )
    .unwrap();
}
