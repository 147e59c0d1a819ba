// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers: an in-memory Atrium server.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};

use atrium_core::{
    Credentials, HeartbeatRequest, Message, MessageId, MessageQuery, OnlineStatus, Principal,
    Registration,
};
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Semaphore;

use crate::remote::{Remote, RemoteError, RemoteFuture, RemoteResult};

/// Deterministic timestamp for message `id`.
pub fn timestamp(id: MessageId) -> DateTime<Utc> {
    Utc.timestamp_opt(1_767_225_600 + id, 0).single().unwrap()
}

/// Create a test message with the given id.
pub fn make_message(id: MessageId) -> Message {
    Message {
        id,
        content: format!("message {}", id),
        sender: "ana".to_string(),
        created_at: timestamp(id),
    }
}

/// Create test messages for every id in `ids`.
pub fn make_messages(ids: RangeInclusive<MessageId>) -> Vec<Message> {
    ids.map(make_message).collect()
}

pub fn make_principal(name: &str, watermark: MessageId) -> Principal {
    Principal {
        name: name.to_string(),
        bio: format!("{} bio", name),
        unread_watermark: watermark,
        created_at: timestamp(0),
        status: OnlineStatus::default(),
    }
}

#[derive(Default)]
struct FakeState {
    /// Log in ascending id order.
    messages: Vec<Message>,
    /// username -> (secret, profile)
    users: HashMap<String, (String, Principal)>,
    offline: bool,
    heartbeat_failures: usize,
    heartbeat_calls: usize,
    list_calls: usize,
    list_queries: Vec<MessageQuery>,
    read_marks: Vec<MessageId>,
    list_gate: Option<Arc<Semaphore>>,
    heartbeat_gate: Option<Arc<Semaphore>>,
}

/// In-memory stand-in for the Atrium server.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Append messages to the log.
    pub fn push_messages(&self, ids: RangeInclusive<MessageId>) {
        self.state.lock().unwrap().messages.extend(make_messages(ids));
    }

    pub fn add_user(&self, name: &str, secret: &str) {
        self.state.lock().unwrap().users.insert(
            name.to_string(),
            (secret.to_string(), make_principal(name, 0)),
        );
    }

    /// Every request fails with a network error while offline.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// The next `n` heartbeats fail with a network error.
    pub fn fail_heartbeats(&self, n: usize) {
        self.state.lock().unwrap().heartbeat_failures = n;
    }

    /// Subsequent list calls wait for a permit on the returned semaphore.
    pub fn hold_lists(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.state.lock().unwrap().list_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Subsequent heartbeats wait for a permit before answering.
    ///
    /// The server applies the heartbeat when it arrives; only the answer is held.
    pub fn hold_heartbeats(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.state.lock().unwrap().heartbeat_gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn heartbeat_calls(&self) -> usize {
        self.state.lock().unwrap().heartbeat_calls
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn list_queries(&self) -> Vec<MessageQuery> {
        self.state.lock().unwrap().list_queries.clone()
    }

    pub fn read_marks(&self) -> Vec<MessageId> {
        self.state.lock().unwrap().read_marks.clone()
    }

    pub fn watermark(&self, name: &str) -> Option<MessageId> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(name)
            .map(|(_, p)| p.unread_watermark)
    }

    fn authenticate(state: &FakeState, username: &str, secret: &str) -> RemoteResult<()> {
        match state.users.get(username) {
            Some((stored, _)) if stored == secret => Ok(()),
            Some(_) => Err(RemoteError::Auth("Invalid password".to_string())),
            // The server reports unknown users on authenticated routes as 500.
            None => Err(RemoteError::Api {
                status: 500,
                body: "User not found".to_string(),
            }),
        }
    }
}

fn offline() -> RemoteError {
    RemoteError::Network("connection refused".to_string())
}

impl Remote for FakeRemote {
    fn list_messages(&self, query: MessageQuery) -> RemoteFuture<'_, Vec<Message>> {
        let (result, gate) = {
            let mut state = self.state.lock().unwrap();
            state.list_calls += 1;
            state.list_queries.push(query);
            let result = if state.offline {
                Err(offline())
            } else {
                Ok(state
                    .messages
                    .iter()
                    .rev()
                    .skip(query.offset)
                    .take(query.limit)
                    .cloned()
                    .collect::<Vec<_>>())
            };
            (result, state.list_gate.clone())
        };

        Box::pin(async move {
            if let Some(gate) = gate {
                let _permit = gate.acquire().await;
            }
            result
        })
    }

    fn create_message(
        &self,
        credentials: Credentials,
        content: String,
    ) -> RemoteFuture<'_, Message> {
        let result = {
            let mut state = self.state.lock().unwrap();
            if state.offline {
                Err(offline())
            } else {
                Self::authenticate(&state, &credentials.username, &credentials.secret).map(|()| {
                    let id = state.messages.last().map(|m| m.id).unwrap_or(0) + 1;
                    let message = Message {
                        id,
                        content,
                        sender: credentials.username.clone(),
                        created_at: timestamp(id),
                    };
                    state.messages.push(message.clone());
                    message
                })
            }
        };
        Box::pin(async move { result })
    }

    fn heartbeat(&self, request: HeartbeatRequest) -> RemoteFuture<'_, OnlineStatus> {
        let (result, gate) = {
            let mut state = self.state.lock().unwrap();
            state.heartbeat_calls += 1;
            let result = if state.offline {
                Err(offline())
            } else if state.heartbeat_failures > 0 {
                state.heartbeat_failures -= 1;
                Err(RemoteError::Network("timed out".to_string()))
            } else {
                Self::authenticate(&state, &request.username, &request.password).map(|()| {
                    if let Some(height) = request.message_height {
                        state.read_marks.push(height);
                        if let Some((_, principal)) = state.users.get_mut(&request.username) {
                            principal.unread_watermark = principal.unread_watermark.max(height);
                        }
                    }
                    OnlineStatus {
                        online: true,
                        last_seen: Some(timestamp(0)),
                    }
                })
            };
            (result, state.heartbeat_gate.clone())
        };

        Box::pin(async move {
            if let Some(gate) = gate {
                let _permit = gate.acquire().await;
            }
            result
        })
    }

    fn get_principal(&self, username: String) -> RemoteFuture<'_, Principal> {
        let result = {
            let state = self.state.lock().unwrap();
            if state.offline {
                Err(offline())
            } else {
                state
                    .users
                    .get(&username)
                    .map(|(_, p)| p.clone())
                    .ok_or_else(|| RemoteError::NotFound("User not found".to_string()))
            }
        };
        Box::pin(async move { result })
    }

    fn register(&self, registration: Registration) -> RemoteFuture<'_, Principal> {
        let result = {
            let mut state = self.state.lock().unwrap();
            if state.offline {
                Err(offline())
            } else if state.users.contains_key(&registration.name) {
                Err(RemoteError::Api {
                    status: 400,
                    body: format!("User '{}' already exists", registration.name),
                })
            } else {
                let mut principal = make_principal(&registration.name, 0);
                principal.bio = registration.bio.clone();
                state.users.insert(
                    registration.name.clone(),
                    (registration.password.clone(), principal.clone()),
                );
                Ok(principal)
            }
        };
        Box::pin(async move { result })
    }
}
