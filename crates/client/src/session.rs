// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session coordination.
//!
//! Owns the authenticated identity, persists it across restarts, and moves
//! the client between operating modes:
//!
//! ```text
//! unknown ──restore, identity──► offline ──background login ok──► online
//!    │                              ▲                               │
//!    └──no identity──► unauthenticated ──login ok──► online         │
//!                                                     └──heartbeat exhausted
//! any ──logout / credentials rejected──► unauthenticated
//! ```
//!
//! Polling only runs while online.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use atrium_core::store::{get_json, keys, put_json};
use atrium_core::{
    ClientConfig, Credentials, HeartbeatRequest, Message, MessageId, Principal, Registration,
    Store,
};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::presence::{HaltReason, PresenceHeartbeat};
use crate::remote::{Remote, RemoteError};
use crate::sync::SyncEngine;

/// Client operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Nothing restored yet.
    #[default]
    Unknown,
    Unauthenticated,
    /// Identity known, showing cached data without live sync.
    Offline,
    Online,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Unknown => "unknown",
            Mode::Unauthenticated => "unauthenticated",
            Mode::Offline => "offline",
            Mode::Online => "online",
        };
        write!(f, "{}", s)
    }
}

/// The authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub principal: Principal,
    pub credentials: Credentials,
}

/// Errors from user-initiated session actions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid username or password\n  hint: check the password and try again")]
    InvalidCredentials,

    #[error("unknown user '{0}'\n  hint: create the account with `atrium register {0}`")]
    UnknownUser(String),

    #[error("user '{0}' already exists\n  hint: log in with `atrium login {0}`")]
    AlreadyRegistered(String),

    #[error("server unreachable: {0}\n  hint: check the server URL and your network connection")]
    Unreachable(String),

    #[error("not logged in\n  hint: run `atrium login <username>` first")]
    NotLoggedIn,

    #[error("message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Remote(RemoteError),

    #[error(transparent)]
    Storage(#[from] atrium_core::Error),
}

impl SessionError {
    /// Classify a remote failure for an action on behalf of `username`.
    pub fn from_remote(err: RemoteError, username: &str) -> Self {
        match err {
            RemoteError::Auth(_) => SessionError::InvalidCredentials,
            RemoteError::NotFound(_) => SessionError::UnknownUser(username.to_string()),
            RemoteError::Network(msg) => SessionError::Unreachable(msg),
            other => SessionError::Remote(other),
        }
    }

    /// Whether the failure only means the server could not be reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, SessionError::Unreachable(_))
    }
}

/// Result of [`SessionCoordinator::restore_session`].
#[derive(Debug)]
pub struct Restore {
    /// Mode right after restoring from storage.
    pub mode: Mode,
    /// Background login with the stored credentials, resolving to the mode
    /// it left the coordinator in.
    pub reconnect: Option<JoinHandle<Mode>>,
}

struct Inner {
    remote: Arc<dyn Remote>,
    store: Arc<dyn Store>,
    presence: PresenceHeartbeat,
    engine: SyncEngine,
    poll_interval: Duration,
    mode: watch::Sender<Mode>,
    session: watch::Sender<Option<Session>>,
    /// Bumped on every login and logout; background work from an older
    /// generation must not change the mode.
    generation: AtomicU64,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

/// Session coordinator handle. Clones share the same coordinator.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

impl SessionCoordinator {
    pub fn new(remote: Arc<dyn Remote>, store: Arc<dyn Store>, config: &ClientConfig) -> Self {
        let presence = PresenceHeartbeat::new(Arc::clone(&remote), config.heartbeat.clone());
        let engine = SyncEngine::new(Arc::clone(&remote), Arc::clone(&store), config.sync.clone());
        let (mode, _) = watch::channel(Mode::Unknown);
        let (session, _) = watch::channel(None);
        SessionCoordinator {
            inner: Arc::new(Inner {
                remote,
                store,
                presence,
                engine,
                poll_interval: config.sync.poll_interval(),
                mode,
                session,
                generation: AtomicU64::new(0),
                watcher: Mutex::new(None),
            }),
        }
    }

    pub fn mode(&self) -> Mode {
        *self.inner.mode.borrow()
    }

    pub fn subscribe_mode(&self) -> watch::Receiver<Mode> {
        self.inner.mode.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.session.borrow().clone()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<Option<Session>> {
        self.inner.session.subscribe()
    }

    pub fn presence(&self) -> &PresenceHeartbeat {
        &self.inner.presence
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.inner.engine
    }

    /// Verify credentials, persist the identity and go online.
    ///
    /// On failure the current identity is left untouched.
    pub async fn login(
        &self,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Session, SessionError> {
        let credentials = Credentials::new(username, secret);
        let principal = self.authenticate(&credentials).await?;
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let session = Session {
            principal,
            credentials,
        };
        self.establish(&session)?;
        tracing::info!(username = %session.principal.name, "logged in");
        self.go_online(&session, generation).await;
        Ok(session)
    }

    /// Create an account. Does not log in.
    pub async fn register(
        &self,
        username: impl Into<String>,
        secret: impl Into<String>,
        bio: impl Into<String>,
    ) -> Result<Principal, SessionError> {
        let registration = Registration {
            name: username.into(),
            bio: bio.into(),
            password: secret.into(),
        };
        let name = registration.name.clone();
        match self.inner.remote.register(registration).await {
            Ok(principal) => {
                tracing::info!(username = %name, "registered");
                Ok(principal)
            }
            Err(RemoteError::Api { status: 400, .. }) => Err(SessionError::AlreadyRegistered(name)),
            Err(e) => Err(SessionError::from_remote(e, &name)),
        }
    }

    /// Log in, registering the account first if it does not exist.
    pub async fn login_or_register(
        &self,
        username: &str,
        secret: &str,
        bio: &str,
    ) -> Result<Session, SessionError> {
        match self.login(username, secret).await {
            Err(SessionError::UnknownUser(_)) => {
                self.register(username, secret, bio).await?;
                self.login(username, secret).await
            }
            result => result,
        }
    }

    /// Stop presence, forget the identity and the message cache.
    ///
    /// In-memory state is always cleared; an error means the durable
    /// identity could not be fully erased.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_watcher();
        self.inner.presence.stop();
        self.inner.engine.reset();
        self.inner.session.send_replace(None);
        self.set_mode(Mode::Unauthenticated);

        let identity = self.inner.store.remove(keys::IDENTITY);
        let secret = self.inner.store.remove(keys::SECRET);
        identity?;
        secret?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Restore the persisted identity.
    ///
    /// With an identity the coordinator is offline immediately, showing
    /// the cached identity and messages, while a background login runs.
    /// Must be called from within a Tokio runtime.
    pub fn restore_session(&self) -> Restore {
        let Some(session) = self.load_identity() else {
            self.set_mode(Mode::Unauthenticated);
            return Restore {
                mode: Mode::Unauthenticated,
                reconnect: None,
            };
        };

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.engine.hydrate();
        self.inner.session.send_replace(Some(session.clone()));
        self.set_mode(Mode::Offline);
        tracing::debug!(username = %session.principal.name, "restored session");

        let coordinator = self.clone();
        let reconnect = tokio::spawn(async move {
            coordinator
                .reconnect_as(session.credentials, generation)
                .await
        });
        Restore {
            mode: Mode::Offline,
            reconnect: Some(reconnect),
        }
    }

    /// Retry going online with the current identity, e.g. after the
    /// heartbeat gave up.
    pub async fn reconnect(&self) -> Result<Mode, SessionError> {
        let session = self.session().ok_or(SessionError::NotLoggedIn)?;
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self.reconnect_as(session.credentials, generation).await)
    }

    /// Post a message as the logged-in principal and merge it into the cache.
    pub async fn send(&self, content: &str) -> Result<Message, SessionError> {
        if content.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let session = self.session().ok_or(SessionError::NotLoggedIn)?;
        let message = self
            .inner
            .remote
            .create_message(session.credentials.clone(), content.to_string())
            .await
            .map_err(|e| SessionError::from_remote(e, &session.credentials.username))?;
        tracing::debug!(id = message.id, "message sent");
        self.inner.engine.record_sent(message.clone()).await;
        Ok(message)
    }

    /// Mark every cached message read.
    ///
    /// Returns the new watermark, or `None` when nothing new was acknowledged.
    pub async fn mark_all_read(&self) -> Result<Option<MessageId>, SessionError> {
        let session = self.session().ok_or(SessionError::NotLoggedIn)?;
        let latest = self.inner.engine.state().cache.latest_id();
        if latest <= session.principal.unread_watermark
            || !self.inner.engine.mark_read(latest, &session.credentials).await
        {
            return Ok(None);
        }

        self.inner.engine.clear_notifications();
        let mut updated = None;
        self.inner.session.send_if_modified(|current| match current {
            Some(current) if current.principal.name == session.principal.name => {
                current.principal.unread_watermark =
                    current.principal.unread_watermark.max(latest);
                updated = Some(current.principal.clone());
                true
            }
            _ => false,
        });
        if let Some(principal) = updated {
            put_json(self.inner.store.as_ref(), keys::IDENTITY, &principal)?;
        }
        Ok(Some(latest))
    }

    /// Cached messages above the principal's watermark.
    pub fn unread_count(&self) -> usize {
        let watermark = self
            .inner
            .session
            .borrow()
            .as_ref()
            .map(|s| s.principal.unread_watermark)
            .unwrap_or(0);
        self.inner.engine.state().unread_after(watermark)
    }

    /// One liveness request verifies the credentials, then the profile is
    /// fetched.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, SessionError> {
        let username = credentials.username.as_str();
        let remote = &self.inner.remote;

        if let Err(e) = remote.heartbeat(HeartbeatRequest::liveness(credentials)).await {
            // Unknown users are not reported as 404 on authenticated routes.
            if let RemoteError::Api { .. } = e {
                if let Err(RemoteError::NotFound(_)) = remote.get_principal(username.to_string()).await {
                    return Err(SessionError::UnknownUser(username.to_string()));
                }
            }
            return Err(SessionError::from_remote(e, username));
        }

        remote
            .get_principal(username.to_string())
            .await
            .map_err(|e| SessionError::from_remote(e, username))
    }

    /// Persist and publish `session`.
    fn establish(&self, session: &Session) -> Result<(), SessionError> {
        put_json(self.inner.store.as_ref(), keys::IDENTITY, &session.principal)?;
        put_json(self.inner.store.as_ref(), keys::SECRET, &session.credentials.secret)?;

        let previous = self.inner.session.send_replace(Some(session.clone()));
        if previous.is_some_and(|p| p.principal.name != session.principal.name) {
            self.inner.engine.reset_read_watermark();
        }
        Ok(())
    }

    fn load_identity(&self) -> Option<Session> {
        let store = self.inner.store.as_ref();
        let identity = get_json::<Principal>(store, keys::IDENTITY);
        let secret = get_json::<String>(store, keys::SECRET);
        match (identity, secret) {
            (Ok(Some(principal)), Ok(Some(secret))) => Some(Session {
                credentials: Credentials::new(principal.name.clone(), secret),
                principal,
            }),
            (Ok(None), Ok(None)) => None,
            (identity, secret) => {
                if let Err(e) = identity.as_ref().and(secret.as_ref()) {
                    tracing::warn!("discarding unreadable identity: {}", e);
                } else {
                    tracing::warn!("discarding incomplete identity");
                }
                for key in [keys::IDENTITY, keys::SECRET] {
                    if let Err(e) = store.remove(key) {
                        tracing::warn!(key, "failed to remove identity: {}", e);
                    }
                }
                None
            }
        }
    }

    async fn reconnect_as(&self, credentials: Credentials, generation: u64) -> Mode {
        match self.authenticate(&credentials).await {
            Ok(principal) => {
                if !self.is_current(generation) {
                    return self.mode();
                }
                let session = Session {
                    principal,
                    credentials,
                };
                if let Err(e) = self.establish(&session) {
                    tracing::warn!("failed to persist refreshed identity: {}", e);
                }
                self.go_online(&session, generation).await;
                self.mode()
            }
            Err(SessionError::InvalidCredentials) if self.is_current(generation) => {
                tracing::warn!("stored credentials rejected, logging out");
                if let Err(e) = self.logout() {
                    tracing::warn!("logout after rejection incomplete: {}", e);
                }
                Mode::Unauthenticated
            }
            Err(e) => {
                tracing::warn!("background login failed, staying offline: {}", e);
                self.mode()
            }
        }
    }

    async fn go_online(&self, session: &Session, generation: u64) {
        if !self.is_current(generation) {
            return;
        }
        self.inner
            .engine
            .set_read_watermark(session.principal.unread_watermark);
        self.inner.presence.start(session.credentials.clone());
        self.watch_presence(generation);
        self.set_mode(Mode::Online);

        self.inner.engine.load_initial().await;
        if self.is_current(generation) && self.mode() == Mode::Online {
            self.inner.engine.start_polling(self.inner.poll_interval);
        }
    }

    /// React once to the heartbeat halting itself during `generation`.
    fn watch_presence(&self, generation: u64) {
        let mut rx = self.inner.presence.subscribe();
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            let halt = match rx.wait_for(|state| state.halt.is_some()).await {
                Ok(state) => state.halt,
                Err(_) => return,
            };
            if let Some(reason) = halt {
                on_presence_halt(weak, generation, reason);
            }
        });

        let mut watcher = self.lock_watcher();
        if let Some(previous) = watcher.replace(task) {
            previous.abort();
        }
    }

    fn abort_watcher(&self) {
        if let Some(previous) = self.lock_watcher().take() {
            previous.abort();
        }
    }

    fn lock_watcher(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    fn set_mode(&self, mode: Mode) {
        let previous = self.inner.mode.send_replace(mode);
        if previous != mode {
            tracing::info!(from = %previous, to = %mode, "mode changed");
        }
    }
}

fn on_presence_halt(inner: Weak<Inner>, generation: u64, reason: HaltReason) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let coordinator = SessionCoordinator { inner };
    if !coordinator.is_current(generation) {
        return;
    }
    match reason {
        HaltReason::RetriesExhausted => {
            tracing::warn!("presence lost, continuing offline");
            coordinator.inner.engine.stop_polling();
            coordinator.set_mode(Mode::Offline);
        }
        HaltReason::CredentialsRejected => {
            tracing::warn!("credentials rejected by heartbeat, logging out");
            // Drop the watcher handle without aborting the running task.
            coordinator.lock_watcher().take();
            if let Err(e) = coordinator.logout() {
                tracing::warn!("logout after rejection incomplete: {}", e);
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
