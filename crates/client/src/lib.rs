// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! atrium-client: Message sync and presence engine for Atrium.
//!
//! Keeps a persisted local view of the server's append-only message log in
//! step with the server over plain polling, and tracks the local user's
//! presence and unread position.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐     ┌──────────────────┐
//! │ SessionCoordinator │────►│ PresenceHeartbeat│──┐
//! │ (identity, mode)   │     └──────────────────┘  │   ┌──────────┐
//! │                    │     ┌──────────────────┐  ├──►│  Remote  │
//! │                    │────►│    SyncEngine    │──┘   │  (trait) │
//! └─────────┬──────────┘     └────────┬─────────┘      └──────────┘
//!           │                         │
//!           ▼                         ▼
//!     ┌───────────────────────────────────┐
//!     │        Store (identity, cache)    │
//!     └───────────────────────────────────┘
//! ```
//!
//! Each component owns its state and publishes it through a
//! [`tokio::sync::watch`] channel; callers subscribe instead of reading
//! shared globals.

pub mod presence;
pub mod remote;
pub mod session;
pub mod sync;

pub use presence::{HaltReason, PresenceHeartbeat, PresenceState, PresenceStatus};
pub use remote::{HttpRemote, Remote, RemoteError, RemoteFuture, RemoteResult};
pub use session::{Mode, Restore, Session, SessionCoordinator, SessionError};
pub use sync::{MessageCache, NotificationState, PollOutcome, SyncEngine, SyncFault, SyncState};

#[cfg(test)]
mod test_helpers;
