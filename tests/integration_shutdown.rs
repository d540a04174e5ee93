#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
use haven_relay::AppBuilder;
use std::time::Duration;
use tokio::sync::watch;

mod common;

#[tokio::test]
async fn test_workers_stop_on_shutdown_signal() {
    common::setup_tracing();
    let mut config = common::get_test_config();
    config.messaging.cleanup_interval_secs = 3600;

    let app = AppBuilder::new(config).build();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tasks = app.workers.spawn_all(shutdown_rx);

    shutdown_tx.send(true).unwrap();

    let joined = tokio::time::timeout(Duration::from_secs(2), futures::future::join_all(tasks)).await.unwrap();
    assert!(joined.iter().all(Result::is_ok));
}

#[tokio::test]
async fn test_disabled_cleanup_worker_exits_immediately() {
    common::setup_tracing();
    let app = AppBuilder::new(common::get_test_config()).build();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let tasks = app.workers.spawn_all(shutdown_rx);

    tokio::time::timeout(Duration::from_secs(2), futures::future::join_all(tasks)).await.unwrap();
}

#[tokio::test]
async fn test_server_stops_accepting_after_shutdown() {
    let app = common::TestApp::spawn().await;
    let url = format!("{}/sessions", app.server_url);
    assert!(app.client.post(&url).send().await.unwrap().status().is_success());

    app.shutdown_tx.send(true).unwrap();

    let mut refused = false;
    for _ in 0..50 {
        if app.client.post(&url).send().await.is_err() {
            refused = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(refused, "server kept accepting requests after shutdown");
}
