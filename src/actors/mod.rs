//! Actor-based monitoring core
//!
//! The monitor runs as an independent async task communicating via Tokio
//! channels.
//!
//! ## Architecture Overview
//!
//! ```text
//!              ┌─────────────────┐
//!              │   main (bin)    │
//!              └────────┬────────┘
//!                       │ spawns
//!              ┌────────▼────────┐
//!              │  MonitorActor   │  owns StatusTracker + OutageLedger
//!              └────────┬────────┘
//!          per cycle    │ fan-out (bounded)
//!        ┌──────────────┼──────────────┐
//!        ▼              ▼              ▼
//!     probe 1        probe 2        probe N
//!        └──────────────┼──────────────┘
//!                       │ joined results
//!              ┌────────▼────────┐
//!              │ Broadcast Chan  │  (CycleEvent)
//!              └─────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the actor has an mpsc command channel for control
//!    messages (CycleNow, Shutdown)
//! 2. **Events**: a cycle summary is published to a broadcast channel after
//!    every cycle for fan-out to subscribers
//! 3. **Request/Response**: oneshot channels acknowledge commands, the
//!    shutdown ack is only sent after the final flush

pub mod messages;
pub mod monitor;
