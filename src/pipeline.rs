//! Sequences fetch, insight and mapping into one run.
//!
//! Only the fetch stage is required. The insight and mapping stages are
//! downgraded to skipped when their prerequisite is missing and recorded as
//! failed when the external service errors; neither aborts the run.
//! Filesystem errors while persisting artifacts do abort it.

use anyhow::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::StageError;
use crate::fetch::HttpClient;
use crate::gbfs::GbfsClient;
use crate::manifest::{FetchDetails, InsightDetails, RunManifest, StageReport};
use crate::output::{write_json, write_records, write_text};
use crate::services::insight_api::InsightApi;
use crate::services::map_host::{ExportFormat, MapHost, MapRequest, MapStyle};
use crate::station::{StationRecord, join_stations};
use crate::stats::StationSummary;

/// Format of the stamp shared by all artifacts of one run.
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub use_insights: bool,
    pub create_map: bool,
    pub export_format: ExportFormat,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub feature_class: String,
    pub map_name: String,
    pub layout_name: String,
    pub map_title: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            use_insights: true,
            create_map: true,
            export_format: ExportFormat::default(),
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            feature_class: "Bikeshare_Stations".into(),
            map_name: "Bikeshare_Analysis_Map".into(),
            layout_name: "Bikeshare_Layout".into(),
            map_title: "Bike-Share Station Utilization Analysis".into(),
        }
    }
}

/// Result of the fetch stage, kept for the later stages.
pub struct StationTable {
    pub records: Vec<StationRecord>,
    pub csv_path: PathBuf,
    pub summary: StationSummary,
}

/// A finished run and where its manifest was written.
#[derive(Debug)]
pub struct RunOutcome {
    pub manifest: RunManifest,
    pub manifest_path: PathBuf,
}

pub struct Pipeline<C> {
    options: PipelineOptions,
    feeds: GbfsClient<C>,
    insight: Result<Box<dyn InsightApi>, StageError>,
    map_host: Result<Box<dyn MapHost>, StageError>,
}

impl<C: HttpClient> Pipeline<C> {
    pub fn new(options: PipelineOptions, feeds: GbfsClient<C>) -> Self {
        Self {
            options,
            feeds,
            insight: Err(StageError::NotConfigured("insight")),
            map_host: Err(StageError::NotConfigured("map")),
        }
    }

    /// Supplies the insight client, or the reason none is available.
    pub fn with_insight(mut self, insight: Result<Box<dyn InsightApi>, StageError>) -> Self {
        self.insight = insight;
        self
    }

    /// Supplies the GIS host, or the reason none is available.
    pub fn with_map_host(mut self, host: Result<Box<dyn MapHost>, StageError>) -> Self {
        self.map_host = host;
        self
    }

    /// Runs every stage and writes the manifest.
    ///
    /// Returns `Ok` even when fetching produced no stations; inspect
    /// `manifest.data_fetch` for that case.
    #[tracing::instrument(
        skip(self),
        fields(use_insights = self.options.use_insights, create_map = self.options.create_map)
    )]
    pub async fn run(&self) -> Result<RunOutcome> {
        let started_at = Utc::now();
        let stamp = started_at.format(STAMP_FORMAT).to_string();

        let mut manifest = RunManifest::new(&stamp, started_at);

        info!(run_id = %stamp, "[Step 1] Fetching station data");
        let table = self.fetch_stage(&stamp, &mut manifest).await?;

        if let Some(table) = &table {
            info!("[Step 2] Insight analysis");
            self.insight_stage(table, &stamp, &mut manifest).await?;

            info!("[Step 3] Map creation");
            self.map_stage(table, &stamp, &mut manifest).await;
        }

        manifest.finished_at = Some(Utc::now());
        let manifest_path = self
            .options
            .output_dir
            .join(format!("pipeline_results_{stamp}.json"));
        write_json(&manifest_path, &manifest)?;

        info!(
            path = %manifest_path.display(),
            executed = ?manifest.executed_stages(),
            "Pipeline complete"
        );
        Ok(RunOutcome {
            manifest,
            manifest_path,
        })
    }

    /// Fetches, joins and persists the station table.
    ///
    /// Returns `Ok(None)` when no station could be joined, after recording
    /// the failure in the manifest.
    pub async fn fetch_stage(
        &self,
        stamp: &str,
        manifest: &mut RunManifest,
    ) -> Result<Option<StationTable>> {
        std::fs::create_dir_all(&self.options.data_dir)?;
        std::fs::create_dir_all(&self.options.output_dir)?;

        let snapshot = self.feeds.snapshot(&self.options.data_dir, stamp).await?;

        let (records, join) = match (&snapshot.information, &snapshot.status) {
            (Some(info), Some(status)) => join_stations(info, status, Utc::now()),
            _ => Default::default(),
        };
        let active_alerts = snapshot.alerts.as_ref().map_or(0, Vec::len);

        manifest.fetch = Some(FetchDetails {
            num_stations: records.len(),
            system_name: snapshot.system.as_ref().map(|s| s.name.clone()),
            active_alerts,
            unavailable_feeds: snapshot.unavailable.clone(),
            join,
            raw_files: snapshot.raw_files.clone(),
        });

        if records.is_empty() {
            error!(unavailable = ?snapshot.unavailable, "No station data available");
            manifest.data_fetch = StageReport::failed("no station records after joining feeds");
            return Ok(None);
        }

        let csv_path = self
            .options
            .data_dir
            .join(format!("combined_stations_{stamp}.csv"));
        write_records(&csv_path, &records)?;

        let summary = StationSummary::from_records(&records, snapshot.system.as_ref(), active_alerts);
        let summary_path = self
            .options
            .output_dir
            .join(format!("data_summary_{stamp}.txt"));
        write_text(&summary_path, &summary.render())?;

        info!(stations = records.len(), csv = %csv_path.display(), "Station table saved");
        manifest.data_fetch = StageReport::completed()
            .with_output("csv", &csv_path)
            .with_output("summary", &summary_path);

        Ok(Some(StationTable {
            records,
            csv_path,
            summary,
        }))
    }

    async fn insight_stage(
        &self,
        table: &StationTable,
        stamp: &str,
        manifest: &mut RunManifest,
    ) -> Result<()> {
        if !self.options.use_insights {
            info!("Skipping insight analysis (disabled)");
            manifest.genai_analysis = StageReport::skipped("disabled by flag");
            return Ok(());
        }
        let client = match &self.insight {
            Ok(client) => client,
            Err(e) => {
                warn!(reason = %e, "Skipping insight analysis");
                manifest.genai_analysis = StageReport::skipped(e.to_string());
                return Ok(());
            }
        };

        let data_summary = table.summary.render();
        let analysis = match client.analyze(&data_summary).await {
            Ok(insight) => insight,
            Err(e) => {
                error!(error = %e, "Insight analysis failed");
                manifest.genai_analysis = StageReport::failed(e.to_string());
                return Ok(());
            }
        };

        let analysis_path = self
            .options
            .output_dir
            .join(format!("genai_analysis_{stamp}.txt"));
        write_text(&analysis_path, &analysis.text)?;
        let mut report = StageReport::completed().with_output("analysis", &analysis_path);
        info!(model = %analysis.model, "Insight analysis complete");

        let design_usage = match client
            .design_recommendations(&analysis.text, &data_summary)
            .await
        {
            Ok(design) => {
                let design_path = self
                    .options
                    .output_dir
                    .join(format!("map_design_recommendations_{stamp}.txt"));
                write_text(&design_path, &design.text)?;
                report = report.with_output("design_recommendations", &design_path);
                Some(design.usage)
            }
            Err(e) => {
                warn!(error = %e, "Map design recommendations failed");
                None
            }
        };

        manifest.insight = Some(InsightDetails {
            model: analysis.model,
            analysis_usage: analysis.usage,
            design_usage,
        });
        manifest.genai_analysis = report;
        Ok(())
    }

    async fn map_stage(&self, table: &StationTable, stamp: &str, manifest: &mut RunManifest) {
        if !self.options.create_map {
            info!("Skipping map creation (disabled)");
            manifest.map_creation = StageReport::skipped("disabled by flag");
            return;
        }
        let host = match &self.map_host {
            Ok(host) => host,
            Err(e) => {
                warn!(reason = %e, "Skipping map creation");
                manifest.map_creation = StageReport::skipped(e.to_string());
                return;
            }
        };

        let request = self.map_request(&table.csv_path, stamp);
        info!(host = %host.describe(), "Exporting map");
        manifest.map_creation = match host.export(&request).await {
            Ok(path) => StageReport::completed().with_output("map", &path),
            Err(e) => {
                error!(error = %e, "Map creation failed");
                StageReport::failed(e.to_string())
            }
        };
    }

    fn map_request(&self, csv_path: &Path, stamp: &str) -> MapRequest {
        let o = &self.options;
        MapRequest {
            csv_path: csv_path.to_path_buf(),
            output_path: o.output_dir.join(format!(
                "bikeshare_map_{stamp}.{}",
                o.export_format.extension()
            )),
            format: o.export_format,
            feature_class: o.feature_class.clone(),
            map_name: o.map_name.clone(),
            layout_name: o.layout_name.clone(),
            title: o.map_title.clone(),
            style: MapStyle::default(),
        }
    }
}
