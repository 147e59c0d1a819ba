// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use atrium_client::{Mode, PresenceState, SyncFault};
use atrium_core::Message;
use serde::Serialize;

/// Format a message as a single transcript line.
///
/// Timestamps are shown in UTC.
pub fn format_message(message: &Message) -> String {
    format!(
        "#{} {} {}: {}",
        message.id,
        message.created_at.format("%Y-%m-%d %H:%M"),
        message.sender,
        message.content
    )
}

/// One line describing why the shown messages may be stale.
pub fn format_fault(fault: &SyncFault) -> String {
    if fault.is_degraded() {
        format!("offline: {}", fault)
    } else {
        format!("error: {}", fault)
    }
}

/// Machine-readable `status` output.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub mode: String,
    pub username: Option<String>,
    pub presence: String,
    pub cached: usize,
    pub unread: usize,
    pub watermark: i64,
    pub last_error: Option<String>,
}

impl StatusReport {
    pub fn to_text(&self) -> String {
        let Some(username) = &self.username else {
            return "not logged in".to_string();
        };
        let mut out = format!(
            "{} as {} ({})\n{} cached, {} unread (read through #{})",
            self.mode, username, self.presence, self.cached, self.unread, self.watermark
        );
        if let Some(err) = &self.last_error {
            out.push_str(&format!("\nlast error: {}", err));
        }
        out
    }
}

/// Presence summary, e.g. `connected` or `error, retry in 2s`.
pub fn format_presence(state: &PresenceState) -> String {
    match state.current_backoff_ms {
        0 => state.status.to_string(),
        ms => format!("{}, retry in {}s", state.status, ms.div_ceil(1000)),
    }
}

pub fn format_mode_change(mode: Mode) -> String {
    match mode {
        Mode::Online => "online".to_string(),
        Mode::Offline => "offline: showing cached messages".to_string(),
        Mode::Unauthenticated => "logged out".to_string(),
        Mode::Unknown => "unknown".to_string(),
    }
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
