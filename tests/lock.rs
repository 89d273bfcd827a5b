//! Single-flight run lock. Needs Redis at `TEST_REDIS_URL` (and Postgres at
//! `TEST_DATABASE_URL` for the app state); run with
//! `cargo test -- --ignored`.

mod common;

use common::{dispatch_settings, TestApp};
use skycast::jobs::notification_scheduler::{run_once, RUN_LOCK_KEY};
use std::time::Duration;
use uuid::Uuid;

fn test_key(label: &str) -> String {
    format!("skycast:test:{}:{}", label, Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore]
async fn lock_is_exclusive_until_released() {
    let app = TestApp::live().await;
    let cache = &app.state.cache;
    let key = test_key("exclusive");

    let guard = cache.try_lock(&key, 30).await.unwrap().expect("first lock");
    assert!(cache.try_lock(&key, 30).await.unwrap().is_none());

    cache.unlock(guard).await.unwrap();
    let again = cache.try_lock(&key, 30).await.unwrap().expect("lock after release");
    cache.unlock(again).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn stale_guard_does_not_release_a_newer_lock() {
    let app = TestApp::live().await;
    let cache = &app.state.cache;
    let key = test_key("stale");

    let stale = cache.try_lock(&key, 1).await.unwrap().expect("first lock");
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let current = cache
        .try_lock(&key, 30)
        .await
        .unwrap()
        .expect("lock after expiry");

    cache.unlock(stale).await.unwrap();
    assert!(
        cache.try_lock(&key, 30).await.unwrap().is_none(),
        "expired guard released the current holder's lock"
    );

    cache.unlock(current).await.unwrap();
    let released = cache.try_lock(&key, 30).await.unwrap().expect("lock after release");
    cache.unlock(released).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn run_is_skipped_while_another_holds_the_lock() {
    let app = TestApp::live().await;
    let cache = &app.state.cache;

    // Without an API key a real dispatch would fail, so an Ok status proves
    // no dispatch happened.
    let mut settings = dispatch_settings();
    settings.weather_api_key = None;

    let guard = cache
        .try_lock(RUN_LOCK_KEY, 30)
        .await
        .unwrap()
        .expect("run lock free");

    let status = run_once(&app.state.db, cache, &settings).await;
    cache.unlock(guard).await.unwrap();

    assert_eq!(
        status.unwrap(),
        "Notification run skipped: another run is in progress."
    );

    let err = run_once(&app.state.db, cache, &settings).await.unwrap_err();
    assert!(err.to_string().contains("API key"), "{err:?}");
}
