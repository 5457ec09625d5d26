//! The JSON record of one pipeline run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::gbfs::Feed;
use crate::services::insight_api::TokenUsage;
use crate::station::JoinReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Failed,
    Skipped,
    /// An earlier required stage failed, so this one was never reached.
    NotRun,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub status: StageStatus,
    pub executed: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub outputs: BTreeMap<String, PathBuf>,
}

impl StageReport {
    fn with_status(status: StageStatus, reason: Option<String>) -> Self {
        StageReport {
            status,
            executed: matches!(status, StageStatus::Completed | StageStatus::Failed),
            success: status == StageStatus::Completed,
            reason,
            outputs: BTreeMap::new(),
        }
    }

    pub fn completed() -> Self {
        Self::with_status(StageStatus::Completed, None)
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::with_status(StageStatus::Failed, Some(reason.into()))
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::with_status(StageStatus::Skipped, Some(reason.into()))
    }

    pub fn not_run() -> Self {
        Self::with_status(StageStatus::NotRun, None)
    }

    pub fn with_output(mut self, name: &str, path: &Path) -> Self {
        self.outputs.insert(name.to_string(), path.to_path_buf());
        self
    }
}

/// Details of the fetch stage beyond its status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchDetails {
    pub num_stations: usize,
    pub system_name: Option<String>,
    pub active_alerts: usize,
    pub unavailable_feeds: Vec<Feed>,
    pub join: JoinReport,
    pub raw_files: Vec<PathBuf>,
}

/// Details of the insight stage beyond its status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightDetails {
    pub model: String,
    pub analysis_usage: TokenUsage,
    pub design_usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunManifest {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub data_fetch: StageReport,
    pub genai_analysis: StageReport,
    pub map_creation: StageReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<InsightDetails>,
}

impl RunManifest {
    pub fn new(run_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        RunManifest {
            run_id: run_id.into(),
            started_at,
            finished_at: None,
            data_fetch: StageReport::not_run(),
            genai_analysis: StageReport::not_run(),
            map_creation: StageReport::not_run(),
            fetch: None,
            insight: None,
        }
    }

    /// Names of the stages that actually ran, in pipeline order.
    pub fn executed_stages(&self) -> Vec<&'static str> {
        [
            ("data_fetch", &self.data_fetch),
            ("genai_analysis", &self.genai_analysis),
            ("map_creation", &self.map_creation),
        ]
        .into_iter()
        .filter(|(_, report)| report.executed)
        .map(|(name, _)| name)
        .collect()
    }
}
