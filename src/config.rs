use std::path::PathBuf;

use tracing::trace;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Device list file with `location` and `device` columns
    pub devices: PathBuf,

    /// Seconds between cycle starts
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Per-probe timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Extra failed probes required before an outage is declared
    #[serde(default = "default_confirm_retries")]
    pub confirm_retries: usize,

    /// Upper bound on concurrently running probes
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,

    /// Directory for the per-day outage stores
    #[serde(default = "default_outage_dir")]
    pub outage_dir: PathBuf,

    /// Directory for the per-day operational logs
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_interval() -> u64 {
    30
}

fn default_timeout() -> u64 {
    3
}

fn default_confirm_retries() -> usize {
    1
}

fn default_max_concurrent_probes() -> usize {
    64
}

fn default_outage_dir() -> PathBuf {
    PathBuf::from("outages")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
