// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::presence::PresenceStatus;
use crate::test_helpers::{make_messages, make_principal, FakeRemote};
use atrium_core::MemoryStore;

struct Fixture {
    remote: Arc<FakeRemote>,
    store: Arc<MemoryStore>,
    coordinator: SessionCoordinator,
}

fn fixture_with(remote: Arc<FakeRemote>, store: Arc<MemoryStore>) -> Fixture {
    let coordinator = SessionCoordinator::new(
        Arc::clone(&remote) as Arc<dyn Remote>,
        Arc::clone(&store) as Arc<dyn Store>,
        &ClientConfig::default(),
    );
    Fixture {
        remote,
        store,
        coordinator,
    }
}

/// Server with user ana/pw and messages 1..=5.
fn fixture() -> Fixture {
    let remote = FakeRemote::new();
    remote.add_user("ana", "pw");
    remote.push_messages(1..=5);
    fixture_with(remote, Arc::new(MemoryStore::new()))
}

/// Store holding a previous session for ana with messages 1..=3.
fn persisted_session(secret: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    put_json(store.as_ref(), keys::IDENTITY, &make_principal("ana", 2)).unwrap();
    put_json(store.as_ref(), keys::SECRET, secret).unwrap();
    put_json(store.as_ref(), keys::MESSAGES, &make_messages(1..=3)).unwrap();
    store
}

fn cached_ids(coordinator: &SessionCoordinator) -> Vec<MessageId> {
    coordinator.engine().state().cache.iter().map(|m| m.id).collect()
}

fn stored_identity(store: &MemoryStore) -> Option<Principal> {
    get_json(store, keys::IDENTITY).unwrap()
}

async fn wait_for_mode(coordinator: &SessionCoordinator, mode: Mode) {
    let mut rx = coordinator.subscribe_mode();
    rx.wait_for(|m| *m == mode).await.unwrap();
}

async fn wait_for_connected(coordinator: &SessionCoordinator) {
    let mut rx = coordinator.presence().subscribe();
    rx.wait_for(|s| s.status == PresenceStatus::Connected)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn login_persists_identity_and_goes_online() {
    let f = fixture();

    let session = f.coordinator.login("ana", "pw").await.unwrap();

    assert_eq!(session.principal.name, "ana");
    assert_eq!(f.coordinator.mode(), Mode::Online);
    assert_eq!(f.coordinator.session(), Some(session));
    assert_eq!(stored_identity(&f.store).unwrap().name, "ana");
    let secret: Option<String> = get_json(f.store.as_ref(), keys::SECRET).unwrap();
    assert_eq!(secret.as_deref(), Some("pw"));
    assert_eq!(cached_ids(&f.coordinator), vec![1, 2, 3, 4, 5]);
    assert!(f.coordinator.engine().is_polling());
    wait_for_connected(&f.coordinator).await;
}

#[tokio::test(start_paused = true)]
async fn failed_login_leaves_identity_untouched() {
    let f = fixture();
    f.coordinator.login("ana", "pw").await.unwrap();

    let err = f.coordinator.login("ana", "wrong").await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidCredentials));
    assert_eq!(f.coordinator.session().unwrap().credentials.secret, "pw");
    let secret: Option<String> = get_json(f.store.as_ref(), keys::SECRET).unwrap();
    assert_eq!(secret.as_deref(), Some("pw"));
    assert_eq!(f.coordinator.mode(), Mode::Online);
}

#[tokio::test]
async fn login_unknown_user_is_reported() {
    let f = fixture();

    let err = f.coordinator.login("bo", "pw").await.unwrap_err();

    assert!(matches!(err, SessionError::UnknownUser(ref name) if name == "bo"));
    assert!(f.coordinator.session().is_none());
    assert_eq!(stored_identity(&f.store), None);
}

#[tokio::test]
async fn login_while_unreachable_fails_without_identity() {
    let f = fixture();
    f.remote.set_offline(true);

    let err = f.coordinator.login("ana", "pw").await.unwrap_err();

    assert!(err.is_unreachable());
    assert_eq!(f.coordinator.mode(), Mode::Unknown);
    assert_eq!(stored_identity(&f.store), None);
}

#[tokio::test(start_paused = true)]
async fn login_or_register_creates_missing_account() {
    let f = fixture();

    let session = f
        .coordinator
        .login_or_register("bo", "secret", "hello")
        .await
        .unwrap();

    assert_eq!(session.principal.name, "bo");
    assert_eq!(session.principal.bio, "hello");
    assert_eq!(f.remote.watermark("bo"), Some(0));
    assert_eq!(f.coordinator.mode(), Mode::Online);
}

#[tokio::test]
async fn register_existing_user_is_rejected() {
    let f = fixture();

    let err = f.coordinator.register("ana", "pw", "").await.unwrap_err();

    assert!(matches!(err, SessionError::AlreadyRegistered(ref name) if name == "ana"));
    assert!(err.to_string().contains("hint:"));
}

#[tokio::test]
async fn register_does_not_log_in() {
    let f = fixture();

    let principal = f.coordinator.register("bo", "pw", "bio").await.unwrap();

    assert_eq!(principal.name, "bo");
    assert!(f.coordinator.session().is_none());
    assert_eq!(stored_identity(&f.store), None);
}

#[tokio::test]
async fn restore_without_identity_is_unauthenticated() {
    let f = fixture();

    let restore = f.coordinator.restore_session();

    assert_eq!(restore.mode, Mode::Unauthenticated);
    assert!(restore.reconnect.is_none());
    assert_eq!(f.coordinator.mode(), Mode::Unauthenticated);
}

#[tokio::test(start_paused = true)]
async fn restore_while_unreachable_stays_offline_with_cache() {
    let remote = FakeRemote::new();
    remote.add_user("ana", "pw");
    remote.set_offline(true);
    let f = fixture_with(remote, persisted_session("pw"));

    let restore = f.coordinator.restore_session();
    assert_eq!(restore.mode, Mode::Offline);
    assert_eq!(f.coordinator.session().unwrap().principal.name, "ana");
    assert_eq!(cached_ids(&f.coordinator), vec![1, 2, 3]);

    let mode = restore.reconnect.unwrap().await.unwrap();

    assert_eq!(mode, Mode::Offline);
    assert_eq!(f.coordinator.mode(), Mode::Offline);
    assert_eq!(f.coordinator.session().unwrap().principal.unread_watermark, 2);
    assert_eq!(cached_ids(&f.coordinator), vec![1, 2, 3]);
    assert_eq!(stored_identity(&f.store).unwrap().name, "ana");
    assert!(!f.coordinator.engine().is_polling());
}

#[tokio::test(start_paused = true)]
async fn restore_goes_online_in_background() {
    let remote = FakeRemote::new();
    remote.add_user("ana", "pw");
    remote.push_messages(1..=5);
    let f = fixture_with(remote, persisted_session("pw"));

    let restore = f.coordinator.restore_session();
    let mode = restore.reconnect.unwrap().await.unwrap();

    assert_eq!(mode, Mode::Online);
    assert_eq!(cached_ids(&f.coordinator), vec![1, 2, 3, 4, 5]);
    assert!(f.coordinator.engine().is_polling());
    assert_eq!(f.coordinator.unread_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn restore_with_rejected_secret_logs_out() {
    let remote = FakeRemote::new();
    remote.add_user("ana", "changed");
    let f = fixture_with(remote, persisted_session("pw"));

    let restore = f.coordinator.restore_session();
    let mode = restore.reconnect.unwrap().await.unwrap();

    assert_eq!(mode, Mode::Unauthenticated);
    assert!(f.coordinator.session().is_none());
    assert_eq!(stored_identity(&f.store), None);
    assert!(f.coordinator.engine().state().cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn logout_then_restore_is_unauthenticated_and_empty() {
    let f = fixture();
    f.coordinator.login("ana", "pw").await.unwrap();

    f.coordinator.logout().unwrap();

    assert_eq!(f.coordinator.mode(), Mode::Unauthenticated);
    assert_eq!(f.coordinator.presence().status(), PresenceStatus::Disconnected);
    assert!(!f.coordinator.engine().is_polling());

    let restored = fixture_with(Arc::clone(&f.remote), Arc::clone(&f.store));
    let restore = restored.coordinator.restore_session();
    assert_eq!(restore.mode, Mode::Unauthenticated);
    assert!(restored.coordinator.session().is_none());
    assert!(restored.coordinator.engine().state().cache.is_empty());
}

#[tokio::test]
async fn logout_without_session_succeeds() {
    let f = fixture();
    f.coordinator.logout().unwrap();
    assert_eq!(f.coordinator.mode(), Mode::Unauthenticated);
}

#[tokio::test(start_paused = true)]
async fn exhausted_heartbeat_goes_offline_and_reconnects() {
    let f = fixture();
    f.coordinator.login("ana", "pw").await.unwrap();
    wait_for_connected(&f.coordinator).await;

    f.remote.fail_heartbeats(3);
    wait_for_mode(&f.coordinator, Mode::Offline).await;

    assert!(!f.coordinator.engine().is_polling());
    assert!(f.coordinator.session().is_some());
    assert_eq!(f.coordinator.presence().state().halt, Some(HaltReason::RetriesExhausted));

    assert_eq!(f.coordinator.reconnect().await.unwrap(), Mode::Online);
    assert!(f.coordinator.engine().is_polling());
}

#[tokio::test(start_paused = true)]
async fn heartbeat_rejection_logs_out() {
    let f = fixture();
    f.coordinator.login("ana", "pw").await.unwrap();
    wait_for_connected(&f.coordinator).await;

    f.remote.add_user("ana", "rotated");
    wait_for_mode(&f.coordinator, Mode::Unauthenticated).await;

    assert!(f.coordinator.session().is_none());
    assert_eq!(stored_identity(&f.store), None);
}

#[tokio::test(start_paused = true)]
async fn send_merges_created_message_without_notification() {
    let f = fixture();
    f.coordinator.login("ana", "pw").await.unwrap();

    let message = f.coordinator.send("hello").await.unwrap();

    assert_eq!(message.id, 6);
    assert_eq!(message.sender, "ana");
    let state = f.coordinator.engine().state();
    assert_eq!(state.cache.latest_id(), 6);
    assert_eq!(state.notifications.new_count, 0);
}

#[tokio::test]
async fn send_requires_session_and_content() {
    let f = fixture();

    assert!(matches!(
        f.coordinator.send("   ").await.unwrap_err(),
        SessionError::EmptyMessage
    ));
    assert!(matches!(
        f.coordinator.send("hi").await.unwrap_err(),
        SessionError::NotLoggedIn
    ));
}

#[tokio::test(start_paused = true)]
async fn mark_all_read_advances_watermark_once() {
    let f = fixture();
    f.coordinator.login("ana", "pw").await.unwrap();
    assert_eq!(f.coordinator.unread_count(), 5);

    assert_eq!(f.coordinator.mark_all_read().await.unwrap(), Some(5));
    assert_eq!(f.coordinator.mark_all_read().await.unwrap(), None);

    assert_eq!(f.remote.watermark("ana"), Some(5));
    assert_eq!(f.remote.read_marks(), vec![5]);
    assert_eq!(f.coordinator.unread_count(), 0);
    assert_eq!(stored_identity(&f.store).unwrap().unread_watermark, 5);
}

#[test]
fn session_error_from_remote() {
    assert!(matches!(
        SessionError::from_remote(RemoteError::Auth("no".into()), "ana"),
        SessionError::InvalidCredentials
    ));
    assert!(matches!(
        SessionError::from_remote(RemoteError::NotFound("no".into()), "ana"),
        SessionError::UnknownUser(name) if name == "ana"
    ));
    assert!(SessionError::from_remote(RemoteError::Network("down".into()), "ana").is_unreachable());
    assert!(matches!(
        SessionError::from_remote(RemoteError::Malformed("x".into()), "ana"),
        SessionError::Remote(_)
    ));
}

#[test]
fn mode_display() {
    assert_eq!(Mode::Offline.to_string(), "offline");
    assert_eq!(Mode::Unauthenticated.to_string(), "unauthenticated");
}
