use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::gbfs::SystemInformation;
use crate::station::StationRecord;

const TOP_STATIONS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extent {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStation {
    pub name: String,
    pub utilization_rate: f64,
}

/// Aggregate view of one station snapshot, used as the LLM prompt body.
#[derive(Debug, Default, Serialize)]
pub struct StationSummary {
    pub timestamp: DateTime<Utc>,
    pub system_name: Option<String>,
    pub total_stations: usize,

    // availability
    pub total_bikes: u64,
    pub avg_bikes: f64,
    pub total_docks: u64,
    pub avg_docks: f64,
    pub empty_stations: usize,
    pub full_stations: usize,

    // utilization
    pub avg_utilization: f64,
    pub max_utilization: f64,
    pub min_utilization: f64,

    pub extent: Option<Extent>,
    pub top_stations: Vec<RankedStation>,
    pub active_alerts: usize,
}

impl StationSummary {
    pub fn from_records(
        records: &[StationRecord],
        system: Option<&SystemInformation>,
        active_alerts: usize,
    ) -> Self {
        let mut s = StationSummary {
            timestamp: Utc::now(),
            system_name: system.map(|sys| sys.name.clone()),
            total_stations: records.len(),
            active_alerts,
            ..Default::default()
        };

        if records.is_empty() {
            return s;
        }

        let mut utilization = Vec::with_capacity(records.len());
        let mut extent = Extent {
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
        };

        for r in records {
            s.total_bikes += r.num_bikes_available as u64;
            s.total_docks += r.num_docks_available as u64;

            if r.num_bikes_available == 0 {
                s.empty_stations += 1;
            }

            if r.num_docks_available == 0 {
                s.full_stations += 1;
            }

            utilization.push(r.utilization_rate);

            extent.min_lon = extent.min_lon.min(r.lon);
            extent.max_lon = extent.max_lon.max(r.lon);
            extent.min_lat = extent.min_lat.min(r.lat);
            extent.max_lat = extent.max_lat.max(r.lat);
        }

        let n = records.len() as f64;
        s.avg_bikes = s.total_bikes as f64 / n;
        s.avg_docks = s.total_docks as f64 / n;
        s.avg_utilization = mean(&utilization);
        s.max_utilization = utilization.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        s.min_utilization = utilization.iter().copied().fold(f64::INFINITY, f64::min);
        s.extent = Some(extent);

        let mut ranked: Vec<&StationRecord> = records.iter().collect();
        ranked.sort_by(|a, b| b.utilization_rate.total_cmp(&a.utilization_rate));
        s.top_stations = ranked
            .into_iter()
            .take(TOP_STATIONS)
            .map(|r| RankedStation {
                name: r.name.clone(),
                utilization_rate: r.utilization_rate,
            })
            .collect();

        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn empty_pct(&self) -> f64 {
        Self::pct(self.empty_stations, self.total_stations)
    }

    /// Renders the plain-text summary handed to the insight stage.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.system_name {
            writeln!(f, "System: {name}")?;
        }
        writeln!(f, "Total Stations: {}", self.total_stations)?;

        if self.total_stations > 0 {
            writeln!(f, "Average Bikes Available: {:.2}", self.avg_bikes)?;
            writeln!(f, "Total Bikes Available: {}", self.total_bikes)?;
            writeln!(f, "Average Docks Available: {:.2}", self.avg_docks)?;
            writeln!(f, "Total Docks Available: {}", self.total_docks)?;
            writeln!(
                f,
                "Empty Stations (no bikes): {} ({:.2}%)",
                self.empty_stations,
                self.empty_pct()
            )?;
            writeln!(f, "Full Stations (no docks): {}", self.full_stations)?;
            writeln!(f, "Average Utilization Rate: {:.2}%", self.avg_utilization * 100.0)?;
            writeln!(f, "Max Utilization Rate: {:.2}%", self.max_utilization * 100.0)?;
            writeln!(f, "Min Utilization Rate: {:.2}%", self.min_utilization * 100.0)?;
        }

        if let Some(e) = &self.extent {
            writeln!(f, "Geographic Extent:")?;
            writeln!(f, "  Longitude: {:.4} to {:.4}", e.min_lon, e.max_lon)?;
            writeln!(f, "  Latitude: {:.4} to {:.4}", e.min_lat, e.max_lat)?;
        }

        if self.active_alerts > 0 {
            writeln!(f, "Active System Alerts: {}", self.active_alerts)?;
        }

        if !self.top_stations.is_empty() {
            writeln!(f, "\nTop {} Stations by Utilization:", self.top_stations.len())?;
            for st in &self.top_stations {
                writeln!(f, "  {}: {:.2}%", st.name, st.utilization_rate * 100.0)?;
            }
        }

        Ok(())
    }
}

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
