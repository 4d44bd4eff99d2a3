//! Reachability probing
//!
//! The monitor only cares about a yes/no answer within a bounded time, so the
//! probing mechanism sits behind the [`Prober`] trait and can be swapped out.
//! The default implementation shells out to the system `ping` binary, one
//! echo request per probe.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::time;
use tracing::trace;

/// Reports whether a device is reachable.
///
/// An unreachable device is a normal `Ok(false)` result; only environmental
/// failures (unknown host, missing ping binary) are errors.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, address: &str, timeout: Duration) -> Result<bool>;
}

#[derive(Debug, Clone, Default)]
pub struct PingProber;

impl PingProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, address: &str, timeout: Duration) -> Result<bool> {
        let wait_secs = timeout.as_secs().max(1);
        trace!("pinging {address} (timeout {wait_secs}s)");

        let mut command = Command::new("ping");
        command
            .args(["-c", "1", "-W", &wait_secs.to_string()])
            .arg(address)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // `-W` bounds the echo wait, the outer timeout bounds the process
        let output = match time::timeout(timeout + Duration::from_secs(1), command.output()).await {
            Ok(output) => output.context("failed to execute ping")?,
            Err(_) => return Ok(false),
        };

        if output.status.success() {
            return Ok(true);
        }

        // exit code 1 means no reply, anything else is an environmental failure
        if output.status.code() == Some(1) {
            return Ok(false);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ping failed for {address}: {}", stderr.trim());
    }
}
