//! Graceful shutdown behavior
//!
//! A shutdown must not start a new cycle, must let the in-flight cycle
//! finish, and must flush before acknowledging - no outage data created
//! before the signal may be lost.

use std::sync::Arc;
use std::time::Duration;

use pingwatch::Device;
use pingwatch::actors::monitor::MonitorHandle;
use tempfile::tempdir;
use tokio::sync::broadcast;

use crate::helpers::{ScriptedProber, next_cycle, read_today_file, test_config};

#[tokio::test]
async fn test_shutdown_flushes_open_outage() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), 1);
    let (event_tx, mut event_rx) = broadcast::channel(64);

    let prober = ScriptedProber::new().script("10.0.0.1", &[false]);
    let handle = MonitorHandle::spawn(
        &config,
        vec![Device::new("Library", "10.0.0.1")],
        Arc::new(prober),
        event_tx,
    );

    // the outage is confirmed on the second failing cycle
    next_cycle(&mut event_rx).await;
    let second = next_cycle(&mut event_rx).await;
    assert_eq!(second.summary.active_outages, 1);

    handle.shutdown().await.unwrap();

    // the open record made it to disk with no recovery timestamp
    let stored = read_today_file(&config);
    assert_eq!(stored["Library"].len(), 1);
    assert_eq!(stored["Library"][0].online_at, None);
    assert_eq!(stored["Library"][0].offline_for_secs, None);

    // the actor is gone, further commands fail
    assert!(handle.cycle_now().await.is_err());
}

#[tokio::test]
async fn test_shutdown_waits_for_inflight_cycle_results() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), 1);
    let (event_tx, mut event_rx) = broadcast::channel(64);

    // slow probes keep every cycle busy for a while
    let prober = ScriptedProber::new()
        .with_delay(Duration::from_millis(100))
        .script("10.0.0.1", &[false])
        .script("10.0.0.2", &[false]);
    let handle = MonitorHandle::spawn(
        &config,
        vec![
            Device::new("Library", "10.0.0.1"),
            Device::new("Library", "10.0.0.2"),
            Device::new("Gym", "10.0.0.3"),
        ],
        Arc::new(prober),
        event_tx,
    );

    next_cycle(&mut event_rx).await;
    let second = next_cycle(&mut event_rx).await;
    assert_eq!(second.summary.active_outages, 2);

    // shutdown arrives between cycles; the ack only comes back after the
    // results of every completed probe have been applied and flushed
    handle.shutdown().await.unwrap();

    let stored = read_today_file(&config);
    let open: usize = stored
        .values()
        .flatten()
        .filter(|record| record.online_at.is_none())
        .count();
    assert_eq!(open, 2);
    assert!(!stored.contains_key("Gym"));
}
