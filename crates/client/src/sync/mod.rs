// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Message log synchronization.
//!
//! Keeps a local, persisted slice of the server's append-only log:
//!
//! ```text
//!            load_older (offset paging)          poll_incremental
//!   older ◄──────────────────────────── [cache] ◄─────────────────── newest
//!                                          │
//!                                          ▼
//!                                 Store (capped to cache_limit)
//! ```
//!
//! # Features
//!
//! - Initial page load that degrades to the cached view when offline
//! - Backward pagination that never refetches a consumed offset
//! - Single-flight incremental polling with new-message notifications
//! - Optional gap backfill when a poll sees a full page of unseen messages
//! - Generation guard so results arriving after `reset` are dropped

mod cache;
mod engine;

pub use cache::MessageCache;
pub use engine::{NotificationState, PollOutcome, SyncEngine, SyncFault, SyncState};
