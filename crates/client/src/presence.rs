// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Presence heartbeat.
//!
//! Periodically proves liveness to the server and publishes a single
//! connectivity status. Failures are retried on a backoff table and the
//! heartbeat stops itself after `max_failures` consecutive failures
//! (fail-stop), so an unreachable server is not polled forever. A new
//! [`PresenceHeartbeat::start`] is required after a halt.
//!
//! ```text
//! disconnected ──start──► connecting ──ok──► connected ◄──tick ok──┐
//!                              │                 │                 │
//!                              └─────fail────────┴──► error ──retry ok
//!                                                       │
//!                                     failures >= max ──┴──► disconnected
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use atrium_core::{Credentials, HeartbeatConfig, HeartbeatRequest};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::remote::Remote;

/// Connectivity as derived from heartbeat attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceStatus {
    Connected,
    Connecting,
    #[default]
    Disconnected,
    Error,
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PresenceStatus::Connected => "connected",
            PresenceStatus::Connecting => "connecting",
            PresenceStatus::Disconnected => "disconnected",
            PresenceStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Why the heartbeat stopped itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// `max_failures` consecutive failures.
    RetriesExhausted,
    /// The server rejected the credentials; never retried.
    CredentialsRejected,
}

/// Observable heartbeat state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresenceState {
    pub status: PresenceStatus,
    pub consecutive_failures: u32,
    /// Delay before the pending retry, 0 when none is pending.
    pub current_backoff_ms: u64,
    /// Set when the heartbeat stopped itself; cleared by `start`.
    pub halt: Option<HaltReason>,
    pub last_seen: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

struct Run {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Inner {
    remote: Arc<dyn Remote>,
    config: HeartbeatConfig,
    state: watch::Sender<PresenceState>,
    /// Bumped on every start/stop; results from older runs are dropped.
    generation: AtomicU64,
    run: Mutex<Option<Run>>,
}

/// Heartbeat handle. Clones share the same heartbeat.
#[derive(Clone)]
pub struct PresenceHeartbeat {
    inner: Arc<Inner>,
}

impl PresenceHeartbeat {
    pub fn new(remote: Arc<dyn Remote>, config: HeartbeatConfig) -> Self {
        let (state, _) = watch::channel(PresenceState::default());
        PresenceHeartbeat {
            inner: Arc::new(Inner {
                remote,
                config,
                state,
                generation: AtomicU64::new(0),
                run: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<PresenceState> {
        self.inner.state.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> PresenceState {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> PresenceStatus {
        self.inner.state.borrow().status
    }

    /// Whether a heartbeat loop is currently scheduled.
    pub fn is_running(&self) -> bool {
        self.inner
            .run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|run| !run.task.is_finished())
    }

    /// Start heartbeating with `credentials`, replacing any running heartbeat.
    ///
    /// Sends one heartbeat immediately, then one per configured interval.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, credentials: Credentials) {
        let mut run = self.inner.run.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = run.take() {
            previous.cancel.cancel();
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_replace(PresenceState {
            status: PresenceStatus::Connecting,
            ..PresenceState::default()
        });
        tracing::debug!(username = %credentials.username, "heartbeat starting");

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.inner),
            credentials,
            generation,
            cancel.clone(),
        ));
        *run = Some(Run { cancel, task });
    }

    /// Stop heartbeating and cancel any pending retry.
    ///
    /// A request already in flight completes, but its result is discarded.
    pub fn stop(&self) {
        let mut run = self.inner.run.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = run.take() {
            previous.cancel.cancel();
            tracing::debug!("heartbeat stopped");
        }
        self.inner.state.send_modify(|state| {
            state.status = PresenceStatus::Disconnected;
            state.current_backoff_ms = 0;
        });
    }
}

async fn run_loop(
    inner: Arc<Inner>,
    credentials: Credentials,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        let Some(delay) = inner.send_once(&credentials, generation).await else {
            break;
        };
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Outcome of one heartbeat, decided under the state lock.
enum Outcome {
    Stale,
    Healthy,
    Retry { failures: u32, delay: Duration },
    Halted(HaltReason),
}

impl Inner {
    /// Issue one heartbeat and fold the result into the state.
    ///
    /// Returns the delay before the next attempt, or `None` when the loop
    /// must end.
    async fn send_once(&self, credentials: &Credentials, generation: u64) -> Option<Duration> {
        let result = self
            .remote
            .heartbeat(HeartbeatRequest::liveness(credentials))
            .await;

        let mut outcome = Outcome::Stale;
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            match &result {
                Ok(online) => {
                    state.status = PresenceStatus::Connected;
                    state.consecutive_failures = 0;
                    state.current_backoff_ms = 0;
                    state.halt = None;
                    state.last_seen = online.last_seen;
                    state.last_error = None;
                    outcome = Outcome::Healthy;
                }
                Err(e) => {
                    state.consecutive_failures += 1;
                    state.last_error = Some(e.to_string());
                    if e.is_auth() {
                        state.status = PresenceStatus::Disconnected;
                        state.current_backoff_ms = 0;
                        state.halt = Some(HaltReason::CredentialsRejected);
                        outcome = Outcome::Halted(HaltReason::CredentialsRejected);
                    } else if state.consecutive_failures >= self.config.max_failures {
                        state.status = PresenceStatus::Disconnected;
                        state.current_backoff_ms = 0;
                        state.halt = Some(HaltReason::RetriesExhausted);
                        outcome = Outcome::Halted(HaltReason::RetriesExhausted);
                    } else {
                        let delay = self.config.retry_delay(state.consecutive_failures);
                        state.status = PresenceStatus::Error;
                        state.current_backoff_ms =
                            u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                        outcome = Outcome::Retry {
                            failures: state.consecutive_failures,
                            delay,
                        };
                    }
                }
            }
            true
        });

        match outcome {
            Outcome::Stale => None,
            Outcome::Healthy => {
                tracing::debug!("heartbeat ok");
                Some(self.config.interval())
            }
            Outcome::Retry { failures, delay } => {
                tracing::warn!(
                    failures,
                    retry_in_ms = delay.as_millis() as u64,
                    "heartbeat failed: {}",
                    result.as_ref().err().map(|e| e.to_string()).unwrap_or_default()
                );
                Some(delay)
            }
            Outcome::Halted(reason) => {
                tracing::warn!(?reason, "heartbeat halted");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "presence_tests.rs"]
mod tests;
