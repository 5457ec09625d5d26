//! Joining static station metadata with live status.
//!
//! The join is an inner join on `station_id`: a station missing from either
//! feed is dropped from the table and listed in the [`JoinReport`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::gbfs::{StationInformation, StationStatus};

/// One row of the joined station table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub station_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub capacity: Option<u32>,

    pub num_bikes_available: u32,
    pub num_ebikes_available: Option<u32>,
    pub num_docks_available: u32,
    pub is_installed: Option<bool>,
    pub is_renting: Option<bool>,
    pub is_returning: Option<bool>,
    pub last_reported: Option<i64>,

    pub total_capacity: u64,
    pub utilization_rate: f64,
    pub fetched_at: DateTime<Utc>,
}

impl StationRecord {
    pub fn from_parts(
        info: &StationInformation,
        status: &StationStatus,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let total_capacity =
            u64::from(status.num_bikes_available) + u64::from(status.num_docks_available);
        let utilization_rate = if total_capacity == 0 {
            0.0
        } else {
            status.num_bikes_available as f64 / total_capacity as f64
        };

        StationRecord {
            station_id: info.station_id.clone(),
            name: info.name.clone(),
            lat: info.lat,
            lon: info.lon,
            capacity: info.capacity,
            num_bikes_available: status.num_bikes_available,
            num_ebikes_available: status.num_ebikes_available,
            num_docks_available: status.num_docks_available,
            is_installed: status.is_installed,
            is_renting: status.is_renting,
            is_returning: status.is_returning,
            last_reported: status.last_reported,
            total_capacity,
            utilization_rate,
            fetched_at,
        }
    }
}

/// What the join kept, dropped and de-duplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinReport {
    pub matched: usize,
    pub information_only: Vec<String>,
    pub status_only: Vec<String>,
    pub duplicate_ids: Vec<String>,
}

/// Inner-joins station information with station status on `station_id`.
///
/// Duplicate ids are collapsed before joining: the first information entry
/// wins, and the status entry with the latest `last_reported` wins (the later
/// entry on ties). Rows come out in information-feed order.
pub fn join_stations(
    information: &[StationInformation],
    status: &[StationStatus],
    fetched_at: DateTime<Utc>,
) -> (Vec<StationRecord>, JoinReport) {
    let mut report = JoinReport::default();
    let mut duplicates = HashSet::new();

    let mut latest: HashMap<&str, &StationStatus> = HashMap::with_capacity(status.len());
    for s in status {
        match latest.get(s.station_id.as_str()).copied() {
            Some(existing) => {
                duplicates.insert(s.station_id.clone());
                if s.last_reported >= existing.last_reported {
                    latest.insert(&s.station_id, s);
                }
            }
            None => {
                latest.insert(&s.station_id, s);
            }
        }
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(information.len());
    let mut records = Vec::with_capacity(information.len());
    for info in information {
        if !seen.insert(&info.station_id) {
            duplicates.insert(info.station_id.clone());
            continue;
        }
        match latest.get(info.station_id.as_str()) {
            Some(s) => records.push(StationRecord::from_parts(info, s, fetched_at)),
            None => report.information_only.push(info.station_id.clone()),
        }
    }

    let mut status_only: Vec<String> = latest
        .keys()
        .filter(|id| !seen.contains(*id))
        .map(|id| id.to_string())
        .collect();
    status_only.sort();
    report.status_only = status_only;

    let mut duplicate_ids: Vec<String> = duplicates.into_iter().collect();
    duplicate_ids.sort();
    report.duplicate_ids = duplicate_ids;
    report.matched = records.len();

    if !report.duplicate_ids.is_empty() {
        warn!(ids = ?report.duplicate_ids, "Duplicate station ids collapsed");
    }
    debug!(
        matched = report.matched,
        information_only = report.information_only.len(),
        status_only = report.status_only.len(),
        "Stations joined"
    );

    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str, name: &str) -> StationInformation {
        StationInformation {
            station_id: id.to_string(),
            name: name.to_string(),
            short_name: None,
            lat: 45.5,
            lon: -73.6,
            capacity: Some(20),
        }
    }

    fn status(id: &str, bikes: u32, docks: u32, reported: i64) -> StationStatus {
        StationStatus {
            station_id: id.to_string(),
            num_bikes_available: bikes,
            num_ebikes_available: None,
            num_docks_available: docks,
            is_installed: Some(true),
            is_renting: Some(true),
            is_returning: Some(true),
            last_reported: Some(reported),
        }
    }

    #[test]
    fn test_join_matches_on_id() {
        let (rows, report) = join_stations(
            &[info("1", "A"), info("2", "B")],
            &[status("2", 5, 5, 10), status("1", 3, 1, 10)],
            Utc::now(),
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].station_id, "1");
        assert_eq!(rows[0].num_bikes_available, 3);
        assert_eq!(rows[0].total_capacity, 4);
        assert_eq!(rows[0].utilization_rate, 0.75);
        assert_eq!(report.matched, 2);
    }

    #[test]
    fn test_unmatched_stations_are_dropped_and_reported() {
        let (rows, report) = join_stations(
            &[info("1", "A"), info("2", "B")],
            &[status("2", 1, 1, 0), status("9", 1, 1, 0)],
            Utc::now(),
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(report.information_only, vec!["1".to_string()]);
        assert_eq!(report.status_only, vec!["9".to_string()]);
    }

    #[test]
    fn test_output_has_no_duplicate_ids() {
        let (rows, report) = join_stations(
            &[info("1", "first"), info("1", "second"), info("2", "B")],
            &[
                status("1", 1, 9, 100),
                status("1", 7, 3, 200),
                status("1", 2, 8, 150),
                status("2", 0, 0, 0),
            ],
            Utc::now(),
        );

        let ids: HashSet<_> = rows.iter().map(|r| r.station_id.as_str()).collect();
        assert_eq!(ids.len(), rows.len());
        assert_eq!(rows[0].name, "first");
        assert_eq!(rows[0].num_bikes_available, 7);
        assert_eq!(report.duplicate_ids, vec!["1".to_string()]);
    }

    #[test]
    fn test_zero_capacity_has_zero_utilization() {
        let (rows, _) = join_stations(&[info("1", "A")], &[status("1", 0, 0, 0)], Utc::now());
        assert_eq!(rows[0].utilization_rate, 0.0);
    }

    #[test]
    fn test_counts_near_u32_max() {
        let (rows, _) = join_stations(&[info("1", "A")], &[status("1", u32::MAX, 1, 0)], Utc::now());
        assert_eq!(rows[0].total_capacity, u64::from(u32::MAX) + 1);
        assert!(rows[0].utilization_rate > 0.99 && rows[0].utilization_rate < 1.0);
    }

    #[test]
    fn test_empty_inputs() {
        let (rows, report) = join_stations(&[], &[], Utc::now());
        assert!(rows.is_empty());
        assert_eq!(report, JoinReport::default());
    }
}
