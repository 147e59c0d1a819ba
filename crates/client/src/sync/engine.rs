// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The sync engine: owns [`SyncState`] and every operation that mutates it.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use atrium_core::store::{get_json, keys, put_json};
use atrium_core::{
    Credentials, HeartbeatRequest, Message, MessageId, MessageQuery, Store, SyncConfig,
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::cache::MessageCache;
use crate::remote::{Remote, RemoteError};

/// Why the last fetch did not produce a fresh view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncFault {
    /// The remote failed but cached messages are still shown.
    #[error("showing cached messages: {0}")]
    Degraded(String),

    /// The remote failed and there is nothing cached to show.
    #[error("unable to load messages: {0}")]
    Unavailable(String),
}

impl SyncFault {
    fn from_remote(err: &RemoteError, cache: &MessageCache) -> Self {
        if cache.is_empty() {
            SyncFault::Unavailable(err.to_string())
        } else {
            SyncFault::Degraded(err.to_string())
        }
    }

    /// Degraded faults are informational, not alarming.
    pub fn is_degraded(&self) -> bool {
        matches!(self, SyncFault::Degraded(_))
    }
}

/// New-message counters since the last `clear_notifications`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotificationState {
    pub new_count: usize,
    /// A poll saw a full page of unseen messages, so some were likely skipped.
    pub has_unloaded_unread: bool,
}

/// Observable sync state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    pub cache: MessageCache,
    pub loading: bool,
    pub error: Option<SyncFault>,
    /// Whether older history may exist beyond `backward_offset`.
    pub has_more: bool,
    /// Offset (from the newest message) of the next older page.
    pub backward_offset: usize,
    /// Highest id obtained from a log listing; incremental polls fetch above it.
    pub horizon: MessageId,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub notifications: NotificationState,
}

impl Default for SyncState {
    fn default() -> Self {
        SyncState {
            cache: MessageCache::new(),
            loading: false,
            error: None,
            has_more: true,
            backward_offset: 0,
            horizon: 0,
            last_fetched_at: None,
            notifications: NotificationState::default(),
        }
    }
}

impl SyncState {
    /// Build the state shown before any fetch from persisted messages.
    fn hydrated(messages: Vec<Message>) -> Self {
        let cache = MessageCache::from_messages(messages);
        SyncState {
            backward_offset: cache.len(),
            horizon: cache.latest_id(),
            cache,
            ..SyncState::default()
        }
    }

    /// Number of cached messages above `watermark`.
    pub fn unread_after(&self, watermark: MessageId) -> usize {
        self.cache.unread_after(watermark)
    }
}

/// Result of one incremental poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another gated operation was in flight.
    Skipped,
    /// The remote request failed, or the result was discarded by a reset.
    Failed,
    Fetched { new: usize },
}

struct Run {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Inner {
    remote: Arc<dyn Remote>,
    store: Arc<dyn Store>,
    config: SyncConfig,
    state: watch::Sender<SyncState>,
    /// Serializes every operation that fetches into the cache.
    gate: tokio::sync::Mutex<()>,
    /// Bumped by `reset`; fetches started under an older generation are dropped.
    generation: AtomicU64,
    /// Held while applying a fetch result and persisting it, and by `reset`.
    commit: Mutex<()>,
    /// Highest read watermark the remote acknowledged.
    acknowledged: AtomicI64,
    poller: Mutex<Option<Run>>,
}

/// Sync engine handle. Clones share the same engine.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

impl SyncEngine {
    /// Create an engine, hydrating the cache from `store`.
    pub fn new(remote: Arc<dyn Remote>, store: Arc<dyn Store>, config: SyncConfig) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        let engine = SyncEngine {
            inner: Arc::new(Inner {
                remote,
                store,
                config,
                state,
                gate: tokio::sync::Mutex::new(()),
                generation: AtomicU64::new(0),
                commit: Mutex::new(()),
                acknowledged: AtomicI64::new(0),
                poller: Mutex::new(None),
            }),
        };
        engine.hydrate();
        engine
    }

    /// Replace the in-memory state with the persisted cache.
    ///
    /// A corrupt cache is discarded and removed from the store.
    pub fn hydrate(&self) {
        let _commit = self.inner.lock_commit();
        let messages = match get_json::<Vec<Message>>(self.inner.store.as_ref(), keys::MESSAGES) {
            Ok(messages) => messages.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("discarding unreadable message cache: {}", e);
                if let Err(e) = self.inner.store.remove(keys::MESSAGES) {
                    tracing::warn!("failed to remove message cache: {}", e);
                }
                Vec::new()
            }
        };
        tracing::debug!(count = messages.len(), "hydrated message cache");
        self.inner.state.send_replace(SyncState::hydrated(messages));
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> SyncState {
        self.inner.state.borrow().clone()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Fetch the newest page and replace the cache with it.
    ///
    /// On failure the cache is kept; the fault is degraded when there is
    /// something cached to show.
    pub async fn load_initial(&self) {
        let _gate = self.inner.gate.lock().await;
        let generation = self.inner.generation();
        let page_size = self.inner.config.page_size;

        self.inner.commit(generation, |state| state.loading = true);
        let result = self
            .inner
            .remote
            .list_messages(MessageQuery::latest(page_size))
            .await;

        self.inner.commit(generation, |state| {
            state.loading = false;
            match result {
                Ok(page) => {
                    let fetched = page.len();
                    tracing::debug!(fetched, "loaded initial page");
                    state.cache.replace(page);
                    state.has_more = fetched == page_size;
                    state.backward_offset = fetched;
                    state.horizon = state.cache.latest_id();
                    state.error = None;
                    state.last_fetched_at = Some(Utc::now());
                }
                Err(e) => {
                    tracing::warn!("initial load failed: {}", e);
                    state.error = Some(SyncFault::from_remote(&e, &state.cache));
                }
            }
        });
    }

    /// Fetch the next older page and merge it below the cache.
    ///
    /// Returns false without fetching while a load is running or when the
    /// start of the log is already cached.
    pub async fn load_older(&self) -> bool {
        if !self.inner.can_load_older() {
            return false;
        }
        let _gate = self.inner.gate.lock().await;
        if !self.inner.can_load_older() {
            return false;
        }

        let generation = self.inner.generation();
        let page_size = self.inner.config.page_size;
        let offset = self.inner.state.borrow().backward_offset;

        self.inner.commit(generation, |state| state.loading = true);
        let result = self
            .inner
            .remote
            .list_messages(MessageQuery::page(page_size, offset))
            .await;

        self.inner
            .commit(generation, |state| {
                state.loading = false;
                match result {
                    Ok(page) => {
                        let fetched = page.len();
                        let added = state.cache.merge(page);
                        tracing::debug!(offset, fetched, added, "loaded older page");
                        state.backward_offset += fetched;
                        if fetched < page_size {
                            state.has_more = false;
                        }
                        state.error = None;
                        true
                    }
                    Err(e) => {
                        tracing::warn!(offset, "loading older messages failed: {}", e);
                        state.error = Some(SyncFault::from_remote(&e, &state.cache));
                        false
                    }
                }
            })
            .unwrap_or(false)
    }

    /// Fetch messages newer than anything listed so far.
    ///
    /// Single-flight: returns [`PollOutcome::Skipped`] if any gated operation
    /// is already running.
    pub async fn poll_incremental(&self) -> PollOutcome {
        let Ok(_gate) = self.inner.gate.try_lock() else {
            tracing::trace!("poll skipped, sync busy");
            return PollOutcome::Skipped;
        };
        let generation = self.inner.generation();
        let page_size = self.inner.config.page_size;
        let horizon = self.inner.state.borrow().horizon;

        let page = match self
            .inner
            .remote
            .list_messages(MessageQuery::latest(page_size))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("poll failed: {}", e);
                self.inner.commit(generation, |state| {
                    state.error = Some(SyncFault::from_remote(&e, &state.cache));
                });
                return PollOutcome::Failed;
            }
        };

        let mut fresh: Vec<Message> = page.into_iter().filter(|m| m.id > horizon).collect();
        let mut gap = horizon > 0 && fresh.len() == page_size;

        let mut offset = page_size;
        let mut backfilled = 0;
        while gap && backfilled < self.inner.config.gap_backfill_pages {
            match self
                .inner
                .remote
                .list_messages(MessageQuery::page(page_size, offset))
                .await
            {
                Ok(older) => {
                    let full = older.len() == page_size;
                    let before = fresh.len();
                    fresh.extend(older.into_iter().filter(|m| m.id > horizon));
                    gap = full && fresh.len() - before == page_size;
                    offset += page_size;
                    backfilled += 1;
                }
                Err(e) => {
                    tracing::warn!(offset, "gap backfill failed: {}", e);
                    break;
                }
            }
        }
        if backfilled > 0 {
            tracing::debug!(pages = backfilled, closed = !gap, "gap backfill");
        }

        let added = self.inner.commit(generation, |state| {
            state.horizon = fresh.iter().map(|m| m.id).fold(state.horizon, MessageId::max);
            let added = state.cache.merge(fresh);
            state.backward_offset += added;
            let dropped = state.cache.retain_recent(self.inner.config.memory_limit);
            if dropped > 0 {
                tracing::debug!(dropped, "trimmed oldest cached messages");
                state.backward_offset = state.backward_offset.saturating_sub(dropped);
                state.has_more = true;
            }
            state.notifications.new_count += added;
            if gap {
                state.notifications.has_unloaded_unread = true;
            }
            state.error = None;
            state.last_fetched_at = Some(Utc::now());
            added
        });

        match added {
            Some(new) => {
                if new > 0 {
                    tracing::debug!(new, "poll fetched new messages");
                }
                PollOutcome::Fetched { new }
            }
            None => PollOutcome::Failed,
        }
    }

    /// Merge a message this client just created, without counting it as new.
    ///
    /// Does not advance the poll horizon, so messages created by others in
    /// between are still fetched by the next poll.
    pub async fn record_sent(&self, message: Message) {
        let _gate = self.inner.gate.lock().await;
        let generation = self.inner.generation();
        self.inner.commit(generation, |state| {
            let added = state.cache.merge(vec![message]);
            state.backward_offset += added;
        });
    }

    /// Tell the remote that everything up to `message_id` has been read.
    ///
    /// Never sends a watermark at or below one already acknowledged. Returns
    /// whether the remote acknowledged a new watermark.
    pub async fn mark_read(&self, message_id: MessageId, credentials: &Credentials) -> bool {
        let acknowledged = self.inner.acknowledged.load(Ordering::SeqCst);
        if message_id <= acknowledged {
            tracing::debug!(message_id, acknowledged, "read watermark already acknowledged");
            return false;
        }

        let generation = self.inner.generation();
        let request = HeartbeatRequest::read_through(credentials, message_id);
        match self.inner.remote.heartbeat(request).await {
            Ok(_) => {
                let _commit = self.inner.lock_commit();
                if self.inner.generation() != generation {
                    tracing::debug!(message_id, "discarding read acknowledgement from before reset");
                    return false;
                }
                self.inner.acknowledged.fetch_max(message_id, Ordering::SeqCst);
                tracing::debug!(message_id, "marked read");
                true
            }
            Err(e) => {
                tracing::warn!(message_id, "mark read failed: {}", e);
                false
            }
        }
    }

    /// Record a watermark known to be acknowledged, such as the one in a
    /// freshly fetched profile.
    pub fn set_read_watermark(&self, watermark: MessageId) {
        self.inner.acknowledged.fetch_max(watermark, Ordering::SeqCst);
    }

    /// Forget acknowledged watermarks, e.g. when another principal logs in.
    pub fn reset_read_watermark(&self) {
        self.inner.acknowledged.store(0, Ordering::SeqCst);
    }

    pub fn read_watermark(&self) -> MessageId {
        self.inner.acknowledged.load(Ordering::SeqCst)
    }

    pub fn clear_notifications(&self) {
        self.inner.state.send_if_modified(|state| {
            let cleared = NotificationState::default();
            let changed = state.notifications != cleared;
            state.notifications = cleared;
            changed
        });
    }

    /// Stop polling, clear all state and erase the durable cache.
    ///
    /// Results of fetches started before the reset are discarded.
    pub fn reset(&self) {
        self.stop_polling();
        let _commit = self.inner.lock_commit();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.acknowledged.store(0, Ordering::SeqCst);
        self.inner.state.send_replace(SyncState::default());
        if let Err(e) = self.inner.store.remove(keys::MESSAGES) {
            tracing::warn!("failed to erase message cache: {}", e);
        }
        tracing::debug!("sync state reset");
    }

    /// Poll every `interval` until [`SyncEngine::stop_polling`].
    ///
    /// The first poll happens one interval after the call. Replaces any
    /// running poller.
    pub fn start_polling(&self, interval: Duration) {
        let mut poller = self.inner.lock_poller();
        if let Some(previous) = poller.take() {
            previous.cancel.cancel();
        }
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_loop(
            Arc::downgrade(&self.inner),
            interval,
            cancel.clone(),
        ));
        *poller = Some(Run { cancel, task });
    }

    pub fn stop_polling(&self) {
        if let Some(previous) = self.inner.lock_poller().take() {
            previous.cancel.cancel();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.inner
            .lock_poller()
            .as_ref()
            .is_some_and(|run| !run.task.is_finished())
    }
}

async fn poll_loop(inner: Weak<Inner>, interval: Duration, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        let Some(inner) = inner.upgrade() else {
            break;
        };
        SyncEngine { inner }.poll_incremental().await;
    }
}

impl Inner {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn lock_commit(&self) -> std::sync::MutexGuard<'_, ()> {
        self.commit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_poller(&self) -> std::sync::MutexGuard<'_, Option<Run>> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn can_load_older(&self) -> bool {
        let state = self.state.borrow();
        !state.loading && state.has_more
    }

    /// Apply `apply` to the state unless a reset happened since `generation`.
    ///
    /// Persists the cache when the apply changed it.
    fn commit<R>(&self, generation: u64, apply: impl FnOnce(&mut SyncState) -> R) -> Option<R> {
        let _commit = self.lock_commit();
        if self.generation() != generation {
            tracing::debug!("discarding result from before reset");
            return None;
        }

        let mut result = None;
        let mut snapshot = None;
        self.state.send_modify(|state| {
            let before = fingerprint(&state.cache);
            result = Some(apply(state));
            if fingerprint(&state.cache) != before {
                snapshot = Some(state.cache.recent(self.config.cache_limit).to_vec());
            }
        });
        if let Some(messages) = snapshot {
            self.persist(&messages);
        }
        result
    }

    fn persist(&self, messages: &[Message]) {
        if let Err(e) = put_json(self.store.as_ref(), keys::MESSAGES, messages) {
            tracing::warn!("failed to persist message cache: {}", e);
        }
    }
}

fn fingerprint(cache: &MessageCache) -> (usize, Option<MessageId>, MessageId) {
    (cache.len(), cache.earliest_id(), cache.latest_id())
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
