use std::sync::Arc;
use std::time::Duration;

use bss_session::auth::claims::ParsedToken;
use bss_session::auth::memory::{MemoryIdentityProvider, RefreshBehavior};
use bss_session::config::SessionConfig;
use bss_session::error::SessionError;
use bss_session::session::{SessionManager, SessionStatus};

const TICK: Duration = Duration::from_millis(20);

fn create_manager() -> (Arc<MemoryIdentityProvider>, Arc<SessionManager>) {
    let mut config = SessionConfig::new("http://localhost:8081").unwrap();
    config.development_mode = true;
    config.refresh_interval = TICK;

    let provider = Arc::new(MemoryIdentityProvider::new());
    let manager = Arc::new(SessionManager::new(config, provider.clone()));
    (provider, manager)
}

async fn sign_in(provider: &MemoryIdentityProvider, manager: &SessionManager) {
    provider.sign_in("test-token", ParsedToken::new("user-123", "testuser"));
    manager.initialize().await;
}

#[tokio::test]
async fn test_auto_refresh_refreshes_active_session() {
    let (provider, manager) = create_manager();
    sign_in(&provider, &manager).await;
    provider.set_refresh(RefreshBehavior::Rotate("rotated-token".to_string()));

    manager.start_auto_refresh().unwrap();
    assert!(manager.is_auto_refresh_active());

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(provider.calls().update_token >= 2);
    assert_eq!(manager.access_token(), "rotated-token");
}

#[tokio::test]
async fn test_auto_refresh_skips_when_logged_out() {
    let (provider, manager) = create_manager();

    manager.auto_refresh(TICK).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(provider.calls().update_token, 0);
    // Skipped ticks keep the timer alive
    assert!(manager.is_auto_refresh_active());
}

#[tokio::test]
async fn test_auto_refresh_failure_ends_session() {
    let (provider, manager) = create_manager();
    sign_in(&provider, &manager).await;
    provider.set_refresh(RefreshBehavior::Fail("Refresh failed".to_string()));

    manager.auto_refresh(TICK).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // One failing refresh, later ticks are skipped
    assert_eq!(provider.calls().update_token, 1);
    let state = manager.snapshot();
    assert!(!state.is_authenticated);
    assert!(state.is_consistent());
    assert!(state.error.unwrap().contains("Refresh failed"));
}

#[tokio::test]
async fn test_restarting_auto_refresh_keeps_single_timer() {
    let (provider, manager) = create_manager();
    sign_in(&provider, &manager).await;

    // Each timer ticks once right away, then waits an hour
    manager.auto_refresh(Duration::from_secs(3600)).unwrap();
    manager.auto_refresh(Duration::from_secs(3600)).unwrap();
    manager.auto_refresh(Duration::from_secs(3600)).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(provider.calls().update_token, 1);
}

#[tokio::test]
async fn test_reset_cancels_auto_refresh() {
    let (provider, manager) = create_manager();
    sign_in(&provider, &manager).await;
    manager.auto_refresh(TICK).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    manager.reset();
    assert!(!manager.is_auto_refresh_active());

    // A new session must not be picked up by the cancelled timer
    manager.initialize().await;
    let calls_after_reset = provider.calls().update_token;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(manager.is_authenticated());
    assert_eq!(provider.calls().update_token, calls_after_reset);
}

#[tokio::test]
async fn test_stop_auto_refresh() {
    let (_provider, manager) = create_manager();

    assert!(!manager.stop_auto_refresh());
    manager.auto_refresh(TICK).unwrap();
    assert!(manager.stop_auto_refresh());
    assert!(!manager.is_auto_refresh_active());
}

#[tokio::test]
async fn test_stop_during_refresh_settles_state() {
    let (provider, manager) = create_manager();
    sign_in(&provider, &manager).await;
    provider.set_update_delay(Duration::from_millis(50));

    manager.auto_refresh(Duration::from_secs(3600)).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(manager.status(), SessionStatus::Refreshing);

    assert!(manager.stop_auto_refresh());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let state = manager.snapshot();
    assert!(!state.is_loading);
    assert_eq!(state.status, SessionStatus::Authenticated);
    assert_eq!(state.token, "test-token");
    assert!(state.is_consistent());

    // The manager is usable again
    assert!(manager.refresh_token().await);
}

#[tokio::test]
async fn test_dropped_manager_stops_timer() {
    let (provider, manager) = create_manager();
    sign_in(&provider, &manager).await;
    manager.auto_refresh(TICK).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    drop(manager);
    let calls_at_drop = provider.calls().update_token;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(provider.calls().update_token, calls_at_drop);
}

#[tokio::test]
async fn test_zero_interval_rejected() {
    let (_provider, manager) = create_manager();

    let result = manager.auto_refresh(Duration::ZERO);

    assert!(matches!(result, Err(SessionError::Config(_))));
    assert!(!manager.is_auto_refresh_active());
}

#[test]
fn test_auto_refresh_requires_runtime() {
    let (_provider, manager) = create_manager();

    let result = manager.auto_refresh(TICK);

    assert!(matches!(result, Err(SessionError::Runtime(_))));
}
