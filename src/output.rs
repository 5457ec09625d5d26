//! Persistence of pipeline artifacts.
//!
//! Supports the station CSV, plain-text reports and pretty-printed JSON.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;

use crate::station::StationRecord;

/// Writes the station table as a CSV file with a header row.
///
/// An empty table still produces the header, so downstream tools always see
/// the columns.
pub fn write_records(path: &Path, records: &[StationRecord]) -> Result<()> {
    debug!(path = %path.display(), rows = records.len(), "Writing station CSV");

    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    if records.is_empty() {
        writer.write_record(RECORD_COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}

/// Column names of [`StationRecord`] in CSV order.
pub const RECORD_COLUMNS: &[&str] = &[
    "station_id",
    "name",
    "lat",
    "lon",
    "capacity",
    "num_bikes_available",
    "num_ebikes_available",
    "num_docks_available",
    "is_installed",
    "is_renting",
    "is_returning",
    "last_reported",
    "total_capacity",
    "utilization_rate",
    "fetched_at",
];

/// Reads a station CSV previously written by [`write_records`].
pub fn read_records(path: &Path) -> Result<Vec<StationRecord>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();

    for result in rdr.deserialize() {
        let record: StationRecord = result?;
        rows.push(record);
    }

    Ok(rows)
}

/// Writes a plain-text report.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    debug!(path = %path.display(), bytes = text.len(), "Writing text report");
    fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))
}

/// Serializes `value` as pretty-printed JSON.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    debug!(path = %path.display(), "Writing JSON");
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).with_context(|| format!("cannot write {}", path.display()))
}
