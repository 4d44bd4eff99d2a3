pub mod actors;
pub mod config;
pub mod ledger;
pub mod probe;
pub mod registry;
pub mod tracker;
pub mod util;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A monitored device: a probe target together with the location it belongs
/// to. Many devices may share a location; the pair is immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    pub location: String,
    pub address: String,
}

impl Device {
    pub fn new(location: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            address: address.into(),
        }
    }

    /// Identity used for status and ledger keying.
    ///
    /// The same address listed under two locations counts as two independent
    /// devices with separate status and outage history.
    pub fn id(&self) -> String {
        format!("{}@{}", self.address, self.location)
    }
}

/// Snapshot of one completed probing cycle.
///
/// Produced fresh every cycle for the log stream and event subscribers,
/// never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CycleSummary {
    pub online: usize,
    pub offline: usize,
    pub active_outages: usize,
    pub duration: Duration,
}
