//! Helper functions for integration tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pingwatch::actors::messages::CycleEvent;
use pingwatch::config::Config;
use pingwatch::ledger::OutageRecord;
use pingwatch::probe::Prober;
use tokio::sync::broadcast;

/// Prober replaying a scripted result sequence per address.
///
/// Each probe consumes the next entry for its address; once the script is
/// exhausted the last entry repeats. Unscripted addresses are always
/// reachable. An optional delay simulates slow probes.
pub struct ScriptedProber {
    scripts: Mutex<HashMap<String, Script>>,
    delay: Option<Duration>,
}

struct Script {
    results: Vec<bool>,
    next: usize,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            delay: None,
        }
    }

    pub fn script(self, address: &str, results: &[bool]) -> Self {
        self.scripts.lock().unwrap().insert(
            address.to_string(),
            Script {
                results: results.to_vec(),
                next: 0,
            },
        );
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, address: &str, _timeout: Duration) -> anyhow::Result<bool> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut scripts = self.scripts.lock().unwrap();
        let Some(script) = scripts.get_mut(address) else {
            return Ok(true);
        };
        if script.results.is_empty() {
            return Ok(true);
        }

        let index = script.next.min(script.results.len() - 1);
        script.next += 1;
        Ok(script.results[index])
    }
}

pub fn test_config(dir: &Path, interval_secs: u64) -> Config {
    Config {
        devices: dir.join("devices.csv"),
        interval: interval_secs,
        timeout: 1,
        confirm_retries: 1,
        max_concurrent_probes: 8,
        outage_dir: dir.join("outages"),
        log_dir: dir.join("logs"),
    }
}

/// Wait for the next cycle summary, failing the test after 30 seconds.
pub async fn next_cycle(event_rx: &mut broadcast::Receiver<CycleEvent>) -> CycleEvent {
    tokio::time::timeout(Duration::from_secs(30), event_rx.recv())
        .await
        .expect("timed out waiting for a cycle event")
        .expect("event channel closed")
}

/// Read back the flushed outage store for today.
pub fn read_today_file(config: &Config) -> HashMap<String, Vec<OutageRecord>> {
    let day = chrono::Utc::now().date_naive();
    let path = config
        .outage_dir
        .join(format!("outages_{}.json", day.format("%Y%m%d")));
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&content).expect("day file is not valid JSON")
}
