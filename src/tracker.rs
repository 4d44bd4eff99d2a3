//! Debounced per-device status tracking
//!
//! Converts the stream of raw probe results into confirmed state transitions.
//! A single failed probe only makes a device a suspect; the outage is declared
//! after the configured number of confirmation probes also fail. Recovery is
//! deliberately asymmetric: one successful probe ends an outage immediately.
//!
//! ```text
//! Online ──fail──▶ Confirming ──fail (retries exhausted)──▶ Offline
//!    ▲                  │                                      │
//!    └────success───────┘          ┌───────success─────────────┘
//!    ▲                             │
//!    └─────────────────────────────┘  (emits Closed; Opened on the way down)
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::Device;

/// Status of a single device. Every device starts `Online`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Online,
    /// Tentatively offline, counting failed confirmation probes.
    Confirming { failures: usize },
    Offline,
}

/// Transition emitted by [`StatusTracker::advance`].
///
/// `Opened` fires exactly when a device enters `Offline`; `Closed` fires
/// exactly when it leaves. The tracker never emits two `Opened` for the same
/// device without a `Closed` in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutageEvent {
    Opened { device: Device, at: DateTime<Utc> },
    Closed { device: Device, at: DateTime<Utc> },
}

/// Per-device state machine over all registered devices.
#[derive(Debug)]
pub struct StatusTracker {
    confirm_retries: usize,
    states: HashMap<String, DeviceStatus>,
}

impl StatusTracker {
    /// `confirm_retries` is the number of extra failed probes required before
    /// an outage is declared; clamped to at least 1 so `Offline` is only ever
    /// reached through `Confirming`.
    pub fn new(confirm_retries: usize) -> Self {
        Self {
            confirm_retries: confirm_retries.max(1),
            states: HashMap::new(),
        }
    }

    /// Apply one probe result and return the resulting transition, if any.
    ///
    /// Repeated identical results are idempotent: staying in the same state
    /// emits nothing.
    pub fn advance(
        &mut self,
        device: &Device,
        reachable: bool,
        now: DateTime<Utc>,
    ) -> Option<OutageEvent> {
        let state = self.states.entry(device.id()).or_insert(DeviceStatus::Online);

        let (next, event) = match (*state, reachable) {
            (DeviceStatus::Online, true) => (DeviceStatus::Online, None),

            (DeviceStatus::Online, false) => {
                trace!("{}: probe failed, awaiting confirmation", device.id());
                (DeviceStatus::Confirming { failures: 0 }, None)
            }

            (DeviceStatus::Confirming { .. }, true) => {
                debug!("{}: false alarm, device is reachable again", device.id());
                (DeviceStatus::Online, None)
            }

            (DeviceStatus::Confirming { failures }, false) => {
                if failures + 1 >= self.confirm_retries {
                    (
                        DeviceStatus::Offline,
                        Some(OutageEvent::Opened {
                            device: device.clone(),
                            at: now,
                        }),
                    )
                } else {
                    (DeviceStatus::Confirming { failures: failures + 1 }, None)
                }
            }

            (DeviceStatus::Offline, true) => (
                DeviceStatus::Online,
                Some(OutageEvent::Closed {
                    device: device.clone(),
                    at: now,
                }),
            ),

            (DeviceStatus::Offline, false) => (DeviceStatus::Offline, None),
        };

        *state = next;
        event
    }

    /// Current status of a device; devices never probed report `Online`.
    pub fn status(&self, device: &Device) -> DeviceStatus {
        self.states
            .get(&device.id())
            .copied()
            .unwrap_or(DeviceStatus::Online)
    }

    /// Number of devices with a confirmed outage. `Confirming` devices still
    /// count as online.
    pub fn offline_count(&self) -> usize {
        self.states
            .values()
            .filter(|state| matches!(state, DeviceStatus::Offline))
            .count()
    }
}
