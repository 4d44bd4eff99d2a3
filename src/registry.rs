//! Device registry loading
//!
//! The device source is a comma-delimited file with a header row naming a
//! `location` and a `device` column (in any order). It is read once at
//! startup; a missing or unparsable file is fatal since there is nothing
//! meaningful to monitor without it.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::Device;

/// Load the list of monitored devices.
///
/// Rows are trimmed, blank lines are skipped. The same address may appear
/// under several locations and is then tracked as independent devices;
/// exact duplicate rows are dropped.
pub fn load_devices(path: &Path) -> Result<Vec<Device>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read device list {}", path.display()))?;

    let mut lines = content.lines();
    let header = lines.next().context("device list is empty")?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    let location_column = columns
        .iter()
        .position(|column| column.eq_ignore_ascii_case("location"))
        .context("device list header has no 'location' column")?;
    let device_column = columns
        .iter()
        .position(|column| column.eq_ignore_ascii_case("device"))
        .context("device list header has no 'device' column")?;

    let mut devices = Vec::new();
    let mut seen = HashSet::new();

    for (index, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let (Some(location), Some(address)) =
            (fields.get(location_column), fields.get(device_column))
        else {
            bail!("malformed device list row {}: {line:?}", index + 2);
        };

        if location.is_empty() || address.is_empty() {
            bail!("device list row {} has an empty field: {line:?}", index + 2);
        }

        let device = Device::new(*location, *address);
        if !seen.insert(device.id()) {
            debug!("skipping duplicate device entry {}", device.id());
            continue;
        }

        devices.push(device);
    }

    if devices.is_empty() {
        bail!("device list {} contains no devices", path.display());
    }

    Ok(devices)
}
