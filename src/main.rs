//! CLI entry point for the bike-share pipeline.
//!
//! Fetches GBFS station data, optionally asks a hosted LLM for insights and
//! optionally exports a styled map through ArcGIS Pro, writing every artifact
//! and a run manifest to disk.

use anyhow::Result;
use bikeshare_pipeline::{
    config::Settings,
    error::StageError,
    fetch::BasicClient,
    gbfs::GbfsClient,
    infra::{arcgis::ArcGisProHost, openai::OpenAiClient},
    manifest::RunManifest,
    pipeline::{Pipeline, PipelineOptions, STAMP_FORMAT},
    services::{insight_api::InsightApi, map_host::ExportFormat, map_host::MapHost},
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const FEED_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "bikeshare_pipeline")]
#[command(about = "Bike-share station data → LLM insights → GIS map", long_about = None)]
struct Cli {
    /// Directory for raw feed JSON and station CSVs (overrides DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for reports, maps and run manifests (overrides OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline
    Run {
        /// Skip the LLM insight stage
        #[arg(long, default_value_t = false)]
        no_genai: bool,

        /// Skip the map export stage
        #[arg(long, default_value_t = false)]
        no_map: bool,

        /// Map export format: pdf, png or jpg
        #[arg(short, long, default_value_t = ExportFormat::Pdf)]
        format: ExportFormat,
    },
    /// Fetch and join station data only
    Fetch,
    /// Report which optional stages can run in this environment
    Check,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    let mut settings = Settings::from_env();

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = settings
        .log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"))
        .to_path_buf();
    let log_file_name = settings
        .log_file_path
        .file_name()
        .unwrap_or(OsStr::new("bikeshare_pipeline.log"))
        .to_os_string();

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        settings.output_dir = dir;
    }

    match cli.command {
        Commands::Run {
            no_genai,
            no_map,
            format,
        } => {
            let options = PipelineOptions {
                use_insights: !no_genai,
                create_map: !no_map,
                export_format: format,
                ..options_from(&settings)
            };
            let mut pipeline = Pipeline::new(options, feed_client(&settings)?);

            // Clients are only built for enabled stages, so a disabled stage
            // never touches its credential or host.
            if !no_genai {
                pipeline = pipeline.with_insight(insight_client(&settings));
            }
            if !no_map {
                pipeline = pipeline.with_map_host(map_host(&settings));
            }

            let outcome = pipeline.run().await?;
            let manifest = &outcome.manifest;
            info!(
                manifest = %outcome.manifest_path.display(),
                data_fetch = ?manifest.data_fetch.status,
                genai_analysis = ?manifest.genai_analysis.status,
                map_creation = ?manifest.map_creation.status,
                "Run finished"
            );

            if !manifest.data_fetch.success {
                anyhow::bail!("station data could not be fetched");
            }
        }
        Commands::Fetch => {
            let pipeline = Pipeline::new(options_from(&settings), feed_client(&settings)?);
            let stamp = Utc::now().format(STAMP_FORMAT).to_string();
            let mut manifest = RunManifest::new(&stamp, Utc::now());

            match pipeline.fetch_stage(&stamp, &mut manifest).await? {
                Some(table) => {
                    info!(
                        stations = table.records.len(),
                        csv = %table.csv_path.display(),
                        "Station table fetched"
                    );
                    for line in table.summary.render().lines() {
                        info!("{line}");
                    }
                }
                None => {
                    error!("No station data available");
                    anyhow::bail!("station data could not be fetched");
                }
            }
        }
        Commands::Check => {
            match insight_client(&settings) {
                Ok(client) => info!(model = client.model(), "Insight stage available"),
                Err(e) => warn!(reason = %e, "Insight stage unavailable"),
            }
            match map_host(&settings) {
                Ok(host) => info!(host = %host.describe(), "Map stage available"),
                Err(e) => warn!(reason = %e, "Map stage unavailable"),
            }
            info!(
                base = %settings.gbfs_base_url,
                language = %settings.gbfs_language,
                "Feed source"
            );
        }
    }

    Ok(())
}

fn options_from(settings: &Settings) -> PipelineOptions {
    PipelineOptions {
        data_dir: settings.data_dir.clone(),
        output_dir: settings.output_dir.clone(),
        map_name: settings.map_name.clone(),
        layout_name: settings.layout_name.clone(),
        ..PipelineOptions::default()
    }
}

fn feed_client(settings: &Settings) -> Result<GbfsClient<BasicClient>> {
    Ok(GbfsClient::new(
        BasicClient::with_timeout(FEED_TIMEOUT)?,
        settings.gbfs_base_url.clone(),
        settings.gbfs_language.clone(),
    ))
}

fn insight_client(settings: &Settings) -> Result<Box<dyn InsightApi>, StageError> {
    OpenAiClient::from_settings(settings).map(|c| Box::new(c) as Box<dyn InsightApi>)
}

fn map_host(settings: &Settings) -> Result<Box<dyn MapHost>, StageError> {
    ArcGisProHost::from_settings(settings).map(|h| Box::new(h) as Box<dyn MapHost>)
}
