// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! atrium-core: Shared data model for the Atrium client.
//!
//! This crate provides the wire types exchanged with an Atrium server, the
//! durable key/value store the client persists its state into, and the
//! client configuration file format.

pub mod config;
pub mod error;
pub mod message;
pub mod principal;
pub mod store;

pub use config::{ClientConfig, HeartbeatConfig, SyncConfig};
pub use error::{Error, Result};
pub use message::{Message, MessageId, MessageQuery, NewMessage};
pub use principal::{Credentials, HeartbeatRequest, OnlineStatus, Principal, Registration};
pub use store::{FileStore, MemoryStore, Store};
