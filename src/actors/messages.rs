//! Message types for actor communication

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::CycleSummary;

/// Event published after every completed probing cycle.
///
/// The broadcast channel may lag or drop messages for slow subscribers -
/// this is acceptable as summaries are continuously regenerated and never
/// persisted.
#[derive(Debug, Clone)]
pub struct CycleEvent {
    /// When the cycle's results were applied
    pub timestamp: DateTime<Utc>,

    /// Counts and timing for the cycle
    pub summary: CycleSummary,
}

/// Commands that can be sent to the MonitorActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run a full probing cycle immediately (bypassing the interval timer)
    ///
    /// Used for testing and manual refresh operations.
    CycleNow {
        /// Acknowledged once the cycle's results are applied and flushed
        respond_to: oneshot::Sender<()>,
    },

    /// Gracefully shut down the monitor
    ///
    /// The actor finishes any in-flight cycle, routes its events, flushes
    /// the ledger, and only then sends the acknowledgement.
    Shutdown { respond_to: oneshot::Sender<()> },
}
