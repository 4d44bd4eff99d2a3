//! MonitorActor - drives the periodic probing loop
//!
//! One actor owns the whole measurement pipeline: it fans out probes to every
//! registered device with bounded concurrency, joins the results, feeds them
//! through the status tracker, routes the emitted outage events to the ledger
//! and publishes a cycle summary.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → probe fan-out → join → StatusTracker → OutageLedger → CycleEvent
//!     ↑
//!     └─── Commands (CycleNow, Shutdown)
//! ```
//!
//! All mutable state (status map, current day partition) is owned by this
//! actor and only touched after a cycle's results are joined, so cycle N is
//! fully applied before cycle N+1 dispatches any probe.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use futures::{StreamExt, stream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::ledger::OutageLedger;
use crate::probe::Prober;
use crate::tracker::{OutageEvent, StatusTracker};
use crate::util::format_duration;
use crate::{CycleSummary, Device};

use super::messages::{CycleEvent, MonitorCommand};

pub struct MonitorActor {
    /// Registered devices, immutable after startup
    devices: Vec<Device>,

    /// Reachability probe implementation
    prober: Arc<dyn Prober>,

    /// Debounced per-device status
    tracker: StatusTracker,

    /// Day-partitioned outage persistence
    ledger: OutageLedger,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<MonitorCommand>,

    /// Broadcast sender for cycle summaries
    event_tx: broadcast::Sender<CycleEvent>,

    /// Time between cycle starts
    interval_duration: Duration,

    /// Per-probe timeout
    probe_timeout: Duration,

    /// Upper bound on concurrently running probes
    max_concurrent: usize,
}

impl MonitorActor {
    pub fn new(
        config: &Config,
        devices: Vec<Device>,
        prober: Arc<dyn Prober>,
        command_rx: mpsc::Receiver<MonitorCommand>,
        event_tx: broadcast::Sender<CycleEvent>,
    ) -> Self {
        Self {
            devices,
            prober,
            tracker: StatusTracker::new(config.confirm_retries),
            ledger: OutageLedger::new(&config.outage_dir, Utc::now().date_naive()),
            command_rx,
            event_tx,
            interval_duration: Duration::from_secs(config.interval),
            probe_timeout: Duration::from_secs(config.timeout),
            max_concurrent: config.max_concurrent_probes.max(1),
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or the command channel is
    /// closed. The interval paces cycle starts, so a slow cycle does not
    /// cause cumulative drift beyond one interval.
    #[instrument(skip(self), fields(devices = self.devices.len()))]
    pub async fn run(mut self) {
        debug!("starting monitor actor");

        let mut ticker = interval(self.interval_duration);
        let mut shutdown_ack = None;

        loop {
            // commands win over a simultaneously ready tick, so a queued
            // shutdown never starts another cycle
            tokio::select! {
                biased;

                // Handle commands
                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        MonitorCommand::CycleNow { respond_to } => {
                            debug!("received CycleNow command");
                            self.run_cycle().await;
                            let _ = respond_to.send(());
                        }

                        MonitorCommand::Shutdown { respond_to } => {
                            debug!("received shutdown command");
                            shutdown_ack = Some(respond_to);
                            break;
                        }
                    }
                }

                // Timer tick - run a probing cycle
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }

                // Command channel closed - exit
                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        self.finalize();

        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }

        debug!("monitor actor stopped");
    }

    /// Run one full probing cycle
    ///
    /// 1. Roll the ledger over if the calendar day changed
    /// 2. Fan out probes with bounded concurrency and join all results
    /// 3. Feed every result through the status tracker
    /// 4. Route emitted outage events to the ledger
    /// 5. Flush the ledger and publish the cycle summary
    #[instrument(skip(self))]
    async fn run_cycle(&mut self) {
        let started = Instant::now();

        let today = Utc::now().date_naive();
        if today != self.ledger.day() {
            self.ledger.rollover(today);
        }

        let prober = Arc::clone(&self.prober);
        let timeout = self.probe_timeout;
        let results: Vec<(Device, bool)> = stream::iter(self.devices.clone())
            .map(|device| {
                let prober = Arc::clone(&prober);
                async move {
                    let reachable = match prober.probe(&device.address, timeout).await {
                        Ok(reachable) => reachable,
                        Err(e) => {
                            // environmental failure for one device must not
                            // affect the rest of the cycle
                            warn!(
                                "probe failed for {} ({}): {e:#}",
                                device.address, device.location
                            );
                            false
                        }
                    };
                    (device, reachable)
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let now = Utc::now();
        for (device, reachable) in results {
            if let Some(event) = self.tracker.advance(&device, reachable, now) {
                self.apply_event(event);
            }
        }

        if let Err(e) = self.ledger.flush() {
            error!("failed to flush outage store: {e:#}");
        }

        let offline = self.tracker.offline_count();
        let summary = CycleSummary {
            online: self.devices.len() - offline,
            offline,
            active_outages: self.ledger.open_count(),
            duration: started.elapsed(),
        };

        info!(
            "online: {}, offline: {}, active outages: {} (cycle took {:.1}s)",
            summary.online,
            summary.offline,
            summary.active_outages,
            summary.duration.as_secs_f64()
        );

        // Note: we ignore send errors. It's OK if there are no subscribers.
        let _ = self.event_tx.send(CycleEvent {
            timestamp: now,
            summary,
        });
    }

    /// Route an outage event to the ledger and the log stream
    fn apply_event(&mut self, event: OutageEvent) {
        match event {
            OutageEvent::Opened { device, at } => {
                warn!(
                    "outage started: {} ({}) went offline at {}",
                    device.location,
                    device.address,
                    at.format("%H:%M:%S")
                );
                self.ledger.record_open(&device, at);
            }

            OutageEvent::Closed { device, at } => {
                match self.ledger.record_close(&device, at) {
                    Some(downtime) => info!(
                        "recovery: {} ({}) back online at {} (offline for {})",
                        device.location,
                        device.address,
                        at.format("%H:%M:%S"),
                        format_duration(downtime.to_std().unwrap_or_default())
                    ),
                    None => info!(
                        "recovery: {} ({}) back online at {}",
                        device.location,
                        device.address,
                        at.format("%H:%M:%S")
                    ),
                }
            }
        }
    }

    /// Final flush and session summary before the actor exits
    fn finalize(&mut self) {
        if let Err(e) = self.ledger.flush() {
            error!("final flush failed: {e:#}");
        }

        info!(
            "monitoring stopped: {} outages recorded for {}, {} still open",
            self.ledger.total_records(),
            self.ledger.day(),
            self.ledger.open_count()
        );
        for (location, count) in self.ledger.location_totals() {
            info!("  {location}: {count} outages");
        }
    }
}

/// Handle for controlling a MonitorActor
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
}

impl MonitorHandle {
    /// Spawn a new monitor actor
    pub fn spawn(
        config: &Config,
        devices: Vec<Device>,
        prober: Arc<dyn Prober>,
        event_tx: broadcast::Sender<CycleEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = MonitorActor::new(config, devices, prober, cmd_rx, event_tx);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Run a probing cycle immediately
    pub async fn cycle_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::CycleNow { respond_to: tx })
            .await
            .context("failed to send CycleNow command")?;

        rx.await.context("monitor actor dropped the CycleNow ack")?;
        Ok(())
    }

    /// Gracefully shut down the monitor
    ///
    /// Resolves once the final flush has completed, so no outage data
    /// created before the call is lost.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::Shutdown { respond_to: tx })
            .await
            .context("failed to send Shutdown command")?;

        rx.await.context("monitor actor dropped the shutdown ack")?;
        Ok(())
    }
}
