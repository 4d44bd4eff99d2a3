//! End-to-end outage lifecycle through the real monitor loop
//!
//! These tests drive the interval-paced actor with a scripted prober and
//! assert on the broadcast summaries and the flushed day files.

use std::sync::Arc;

use pingwatch::Device;
use pingwatch::actors::monitor::MonitorHandle;
use tempfile::tempdir;
use tokio::sync::broadcast;

use crate::helpers::{ScriptedProber, next_cycle, read_today_file, test_config};

#[tokio::test]
async fn test_outage_opened_after_confirmation_and_closed_on_recovery() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), 1);
    let (event_tx, mut event_rx) = broadcast::channel(64);

    let prober = ScriptedProber::new().script("10.0.0.1", &[false, false, true]);
    let handle = MonitorHandle::spawn(
        &config,
        vec![Device::new("Library", "10.0.0.1")],
        Arc::new(prober),
        event_tx,
    );

    // cycle 1: probe fails, device is only suspect - no outage yet
    let first = next_cycle(&mut event_rx).await;
    assert_eq!(first.summary.online, 1);
    assert_eq!(first.summary.offline, 0);
    assert_eq!(first.summary.active_outages, 0);

    // cycle 2: confirmation fails, outage opens
    let second = next_cycle(&mut event_rx).await;
    assert_eq!(second.summary.offline, 1);
    assert_eq!(second.summary.active_outages, 1);

    // cycle 3: probe succeeds, outage closes immediately
    let third = next_cycle(&mut event_rx).await;
    assert_eq!(third.summary.online, 1);
    assert_eq!(third.summary.offline, 0);
    assert_eq!(third.summary.active_outages, 0);

    handle.shutdown().await.unwrap();

    let stored = read_today_file(&config);
    let records = &stored["Library"];
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].device, "10.0.0.1");

    let online_at = records[0].online_at.expect("record should be closed");
    assert!(online_at > records[0].offline_at);
    assert_eq!(
        records[0].offline_for_secs,
        Some((online_at - records[0].offline_at).num_seconds())
    );
}

#[tokio::test]
async fn test_flapping_device_never_records_an_outage() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), 1);
    let (event_tx, mut event_rx) = broadcast::channel(64);

    // never two consecutive failures
    let prober = ScriptedProber::new().script("10.0.0.1", &[false, true, false, true]);
    let handle = MonitorHandle::spawn(
        &config,
        vec![Device::new("Library", "10.0.0.1")],
        Arc::new(prober),
        event_tx,
    );

    for _ in 0..4 {
        let event = next_cycle(&mut event_rx).await;
        assert_eq!(event.summary.active_outages, 0);
        assert_eq!(event.summary.offline, 0);
    }

    handle.shutdown().await.unwrap();

    let stored = read_today_file(&config);
    assert!(stored.is_empty(), "no outage records expected: {stored:?}");
}

#[tokio::test]
async fn test_devices_fail_and_recover_independently() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), 1);
    let (event_tx, mut event_rx) = broadcast::channel(64);

    // the Library device stays down, the Gym device stays up
    let prober = ScriptedProber::new().script("10.0.0.1", &[false]);
    let handle = MonitorHandle::spawn(
        &config,
        vec![
            Device::new("Library", "10.0.0.1"),
            Device::new("Gym", "10.0.0.2"),
        ],
        Arc::new(prober),
        event_tx,
    );

    next_cycle(&mut event_rx).await;
    next_cycle(&mut event_rx).await;
    let third = next_cycle(&mut event_rx).await;
    assert_eq!(third.summary.online, 1);
    assert_eq!(third.summary.offline, 1);
    assert_eq!(third.summary.active_outages, 1);

    handle.shutdown().await.unwrap();

    let stored = read_today_file(&config);
    assert_eq!(stored["Library"].len(), 1);
    assert_eq!(stored["Library"][0].online_at, None);
    assert!(!stored.contains_key("Gym"));
}

#[tokio::test]
async fn test_duplicate_address_under_two_locations_is_tracked_twice() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), 1);
    let (event_tx, mut event_rx) = broadcast::channel(64);

    let prober = ScriptedProber::new().script("10.0.0.9", &[false]);
    let handle = MonitorHandle::spawn(
        &config,
        vec![
            Device::new("Library", "10.0.0.9"),
            Device::new("Gym", "10.0.0.9"),
        ],
        Arc::new(prober),
        event_tx,
    );

    next_cycle(&mut event_rx).await;
    next_cycle(&mut event_rx).await;
    let third = next_cycle(&mut event_rx).await;
    assert_eq!(third.summary.active_outages, 2);

    handle.shutdown().await.unwrap();

    let stored = read_today_file(&config);
    assert_eq!(stored["Library"].len(), 1);
    assert_eq!(stored["Gym"].len(), 1);
}
