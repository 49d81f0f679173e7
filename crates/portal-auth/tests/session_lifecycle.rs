use portal_auth::{
    DefaultHeaders, LoginPayload, LogoutPolicy, SessionStore, SignInAction, ThrottleConfig,
    ThrottleState,
};
use portal_storage::{open_session_vault, KeyValueStore, Profile, StorageKeys};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

fn open(path: &Path) -> (SessionStore, DefaultHeaders) {
    let headers = DefaultHeaders::new();
    let store = SessionStore::new(open_session_vault(path).unwrap(), headers.clone());
    (store, headers)
}

fn user(value: serde_json::Value) -> Profile {
    value.as_object().cloned().unwrap()
}

#[test]
fn login_then_logout_leaves_storage_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let (store, headers) = open(&path);

    store.login(&LoginPayload::new("t1", user(json!({"id": 7, "name": "A"}))));
    assert!(store.is_authenticated());
    assert_eq!(headers.authorization().as_deref(), Some("Bearer t1"));

    store.logout();
    assert!(!store.is_authenticated());
    assert!(store.profile().is_empty());

    let vault = open_session_vault(&path).unwrap();
    for key in StorageKeys::ALL {
        assert!(!vault.storage().has(key).unwrap(), "{key} should be gone");
    }
}

#[test]
fn persisted_state_round_trips_through_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let profile = user(json!({"id": "42", "email": "ada@example.com", "roles": ["admin"]}));

    let (store, _) = open(&path);
    store.login(&LoginPayload::new("persisted-token", profile.clone()));
    for _ in 0..4 {
        store.attempt_sign_in(SignInAction::Retry);
    }
    let before = store.snapshot();
    let token_before = store.token();
    drop(store);

    let (reloaded, headers) = open(&path);
    assert_eq!(reloaded.snapshot(), before);
    assert_eq!(reloaded.token(), token_before);
    assert_eq!(reloaded.profile(), profile);
    assert_eq!(reloaded.attempt_count(), 4);
    assert_eq!(reloaded.remaining_secs(), 60);
    assert_eq!(reloaded.throttle_state(), ThrottleState::Locked);
    assert_eq!(headers.authorization().as_deref(), Some("Bearer persisted-token"));
}

#[test]
fn corrupt_profile_rehydrates_as_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let vault = open_session_vault(&path).unwrap();
    vault.set_token("t").unwrap();
    vault.storage().set(StorageKeys::USER_AUTH, "{not json").unwrap();
    vault.storage().set(StorageKeys::SIGN_IN_TRIES, "many").unwrap();

    let (store, _) = open(&path);
    assert!(store.is_authenticated());
    assert!(store.profile().is_empty());
    assert_eq!(store.attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn three_retries_lock_for_sixty_ticks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let (store, _) = open(&path);

    for _ in 0..3 {
        store.attempt_sign_in(SignInAction::Retry);
    }
    assert_eq!(store.attempt_count(), 3);
    assert_eq!(store.remaining_secs(), 60);
    assert_eq!(store.accumulated_backoff_secs(), 60);

    tokio::time::sleep(Duration::from_millis(59_500)).await;
    assert_eq!(store.remaining_secs(), 1);
    assert!(store.is_throttled());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.remaining_secs(), 0);
    assert_eq!(store.throttle_state(), ThrottleState::Open);
    assert_eq!(store.attempt_count(), 3);

    let persisted = open_session_vault(&path).unwrap().counters().unwrap();
    assert_eq!(persisted.remaining_secs, 0);
    assert_eq!(persisted.attempt_count, 3);
}

#[tokio::test(start_paused = true)]
async fn fourth_and_fifth_retry_keep_counting_down() {
    let dir = tempdir().unwrap();
    let (store, _) = open(&dir.path().join("session.json"));

    for _ in 0..3 {
        store.attempt_sign_in(SignInAction::Retry);
    }
    tokio::time::sleep(Duration::from_millis(5_500)).await;

    store.attempt_sign_in(SignInAction::Retry);
    store.attempt_sign_in(SignInAction::Retry);
    assert_eq!(store.attempt_count(), 5);
    assert_eq!(store.remaining_secs(), 55);
    assert_eq!(store.accumulated_backoff_secs(), 60);

    store.attempt_sign_in(SignInAction::Retry);
    assert_eq!(store.accumulated_backoff_secs(), 120);
    assert_eq!(store.remaining_secs(), 120);

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(store.remaining_secs(), 117);
}

#[tokio::test(start_paused = true)]
async fn reload_mid_lockout_resumes_on_initial() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");

    let (store, _) = open(&path);
    for _ in 0..3 {
        store.attempt_sign_in(SignInAction::Retry);
    }
    tokio::time::sleep(Duration::from_millis(20_500)).await;
    assert_eq!(store.remaining_secs(), 40);
    drop(store);

    let (reloaded, _) = open(&path);
    assert_eq!(reloaded.remaining_secs(), 40);
    assert!(!reloaded.has_active_tick());

    reloaded.attempt_sign_in(SignInAction::Initial);
    assert_eq!(reloaded.attempt_count(), 3);
    assert_eq!(reloaded.remaining_secs(), 40);
    assert_eq!(reloaded.accumulated_backoff_secs(), 60);

    assert!(reloaded.wait_until_open().await);
    assert_eq!(reloaded.remaining_secs(), 0);
}

#[tokio::test(start_paused = true)]
async fn lockout_only_expires_in_a_lifetime_that_waits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let persisted_remaining = || {
        open_session_vault(&path)
            .unwrap()
            .counters()
            .unwrap()
            .remaining_secs
    };

    let (store, _) = open(&path);
    for _ in 0..3 {
        store.attempt_sign_in(SignInAction::Retry);
    }
    drop(store);
    assert_eq!(persisted_remaining(), 60);

    // Gives up straight away
    let (store, _) = open(&path);
    store.attempt_sign_in(SignInAction::Initial);
    drop(store);
    tokio::time::sleep(Duration::from_secs(90)).await;
    assert_eq!(persisted_remaining(), 60);

    let (store, _) = open(&path);
    store.attempt_sign_in(SignInAction::Initial);
    tokio::time::sleep(Duration::from_millis(30_500)).await;
    assert_eq!(persisted_remaining(), 30);
    assert!(store.wait_until_open().await);
    assert_eq!(persisted_remaining(), 0);
    drop(store);

    let (store, _) = open(&path);
    store.attempt_sign_in(SignInAction::Initial);
    assert!(!store.is_throttled());
    assert_eq!(store.attempt_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn logout_mid_lockout_stops_the_countdown() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let (store, _) = open(&path);

    store.login(&LoginPayload::new("t", Profile::new()));
    for _ in 0..3 {
        store.attempt_sign_in(SignInAction::Retry);
    }
    tokio::time::sleep(Duration::from_millis(2_500)).await;

    store.logout();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(!store.is_throttled());
    assert_eq!(store.throttle_state(), ThrottleState::Open);
    let vault = open_session_vault(&path).unwrap();
    for key in StorageKeys::ALL {
        assert!(!vault.storage().has(key).unwrap(), "{key} should be gone");
    }
}

#[tokio::test(start_paused = true)]
async fn clear_policy_restarts_window_after_logout() {
    let dir = tempdir().unwrap();
    let store = SessionStore::with_options(
        open_session_vault(&dir.path().join("session.json")).unwrap(),
        DefaultHeaders::new(),
        ThrottleConfig::default(),
        LogoutPolicy::ClearThrottle,
    );

    for _ in 0..3 {
        store.attempt_sign_in(SignInAction::Retry);
    }
    store.logout();

    store.attempt_sign_in(SignInAction::Retry);
    assert_eq!(store.attempt_count(), 1);
    assert!(!store.is_throttled());
}
