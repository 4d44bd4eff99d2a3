//! Day-partitioned outage persistence
//!
//! The ledger owns every [`OutageRecord`]: it appends one when an outage is
//! confirmed, closes it on recovery, and writes the whole current-day
//! partition to a JSON file per calendar day. On day rollover any still-open
//! record moves into the new day's partition, so an outage spanning midnight
//! is neither lost nor duplicated.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::Device;

/// A single outage interval for one device.
///
/// `online_at` and `offline_for_secs` are absent while the outage is open and
/// set exactly once when it closes; the record is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutageRecord {
    pub device: String,
    pub offline_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_for_secs: Option<i64>,
}

/// Position of an open record inside the current partition.
#[derive(Debug, Clone)]
struct OpenSlot {
    location: String,
    index: usize,
}

/// Outage records for one calendar day, grouped by location, plus the index
/// of records that are still open.
///
/// At most one open record exists per device; a second open for the same
/// device signals a state-machine invariant violation and is dropped with a
/// warning instead of corrupting the history.
#[derive(Debug)]
pub struct OutageLedger {
    dir: PathBuf,
    day: NaiveDate,
    partitions: HashMap<String, Vec<OutageRecord>>,
    open: HashMap<String, OpenSlot>,
}

impl OutageLedger {
    /// Create a ledger for `day`, resuming any data already persisted for
    /// that day by an earlier process run.
    ///
    /// Records left open by the earlier run stay in the partition as history
    /// but are not re-indexed as open: the restarted status tracker starts
    /// every device online and a still-down device opens a fresh record once
    /// it is confirmed again.
    pub fn new(dir: impl Into<PathBuf>, day: NaiveDate) -> Self {
        let mut ledger = Self {
            dir: dir.into(),
            day,
            partitions: HashMap::new(),
            open: HashMap::new(),
        };
        ledger.load_existing_day();
        ledger
    }

    /// The calendar day the current partition belongs to.
    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn total_records(&self) -> usize {
        self.partitions.values().map(Vec::len).sum()
    }

    /// Records for one location in the current partition, in creation order.
    pub fn outages_for(&self, location: &str) -> &[OutageRecord] {
        self.partitions
            .get(location)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Record counts per location, sorted by location name.
    pub fn location_totals(&self) -> Vec<(String, usize)> {
        let mut totals: Vec<_> = self
            .partitions
            .iter()
            .map(|(location, records)| (location.clone(), records.len()))
            .collect();
        totals.sort();
        totals
    }

    /// Open a new outage record for `device`.
    pub fn record_open(&mut self, device: &Device, at: DateTime<Utc>) {
        let id = device.id();
        if self.open.contains_key(&id) {
            warn!("outage already open for {id}, ignoring duplicate open");
            return;
        }

        let records = self.partitions.entry(device.location.clone()).or_default();
        records.push(OutageRecord {
            device: device.address.clone(),
            offline_at: at,
            online_at: None,
            offline_for_secs: None,
        });
        self.open.insert(
            id,
            OpenSlot {
                location: device.location.clone(),
                index: records.len() - 1,
            },
        );
    }

    /// Close the open outage record for `device` and return the downtime.
    pub fn record_close(&mut self, device: &Device, at: DateTime<Utc>) -> Option<chrono::Duration> {
        let id = device.id();
        let Some(slot) = self.open.remove(&id) else {
            warn!("no open outage for {id}, ignoring close");
            return None;
        };

        let record = self
            .partitions
            .get_mut(&slot.location)
            .and_then(|records| records.get_mut(slot.index));
        let Some(record) = record else {
            error!("open outage index for {id} points at a missing record");
            return None;
        };

        let downtime = at - record.offline_at;
        record.online_at = Some(at);
        record.offline_for_secs = Some(downtime.num_seconds());
        Some(downtime)
    }

    /// Switch to a new calendar day.
    ///
    /// Still-open records are pulled out of the closing partition before it
    /// is flushed, so the old day's file ends up containing closed records
    /// only, and are re-inserted (moved, not copied) into the fresh partition
    /// with their original `offline_at` preserved.
    pub fn rollover(&mut self, new_day: NaiveDate) {
        info!(
            "day rollover: {} -> {} ({} outages still open)",
            self.day,
            new_day,
            self.open.len()
        );

        let open = std::mem::take(&mut self.open);
        let mut open_by_location: HashMap<String, HashMap<usize, String>> = HashMap::new();
        for (id, slot) in open {
            open_by_location
                .entry(slot.location)
                .or_default()
                .insert(slot.index, id);
        }

        let mut carried: Vec<(String, String, OutageRecord)> = Vec::new();
        for (location, open_indices) in &open_by_location {
            let Some(records) = self.partitions.get_mut(location) else {
                continue;
            };
            let mut kept = Vec::with_capacity(records.len());
            for (index, record) in records.drain(..).enumerate() {
                match open_indices.get(&index) {
                    Some(id) => carried.push((id.clone(), location.clone(), record)),
                    None => kept.push(record),
                }
            }
            *records = kept;
        }
        self.partitions.retain(|_, records| !records.is_empty());

        if let Err(e) = self.flush() {
            error!("failed to flush closing day {}: {e:#}", self.day);
        }

        self.day = new_day;
        self.partitions.clear();
        for (id, location, record) in carried {
            let records = self.partitions.entry(location.clone()).or_default();
            records.push(record);
            self.open.insert(
                id,
                OpenSlot {
                    location,
                    index: records.len() - 1,
                },
            );
        }
    }

    /// Write the full current partition (open and closed records) to the
    /// day's file. The file is written to a temporary sibling and renamed
    /// into place, so a crash mid-write cannot corrupt the persisted day.
    ///
    /// Safe to call repeatedly; a failure leaves the in-memory partition
    /// untouched and the next flush retries the complete write.
    pub fn flush(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create outage directory {}", self.dir.display())
        })?;

        let path = self.day_file(self.day);
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(&self.partitions)
            .context("failed to serialize outage data")?;
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace {}", path.display()))?;

        Ok(())
    }

    fn day_file(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("outages_{}.json", day.format("%Y%m%d")))
    }

    fn load_existing_day(&mut self) {
        let path = self.day_file(self.day);
        if !path.exists() {
            return;
        }

        let loaded = fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|content| {
                serde_json::from_str::<HashMap<String, Vec<OutageRecord>>>(&content)
                    .map_err(Into::into)
            });

        match loaded {
            Ok(partitions) => {
                self.partitions = partitions;
                info!(
                    "resuming {} outage records for {}",
                    self.total_records(),
                    self.day
                );
            }
            Err(e) => {
                warn!(
                    "failed to load existing outage data from {}: {e:#}",
                    path.display()
                );
            }
        }
    }
}
