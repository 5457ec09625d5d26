//! Trait and types for exporting a styled map through a GIS host.

use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// File format of the exported layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Pdf,
    Png,
    Jpg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpg),
            other => Err(anyhow::anyhow!("unsupported export format: {other}")),
        }
    }
}

/// The fixed symbology applied to the station layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapStyle {
    pub field: String,
    pub color_ramp: String,
    pub classification: String,
    pub classes: u8,
    pub page_template: String,
    pub resolution_dpi: u16,
    pub spatial_reference: u32,
    pub x_field: String,
    pub y_field: String,
}

impl Default for MapStyle {
    fn default() -> Self {
        MapStyle {
            field: "utilization_rate".into(),
            color_ramp: "Red-Yellow-Green".into(),
            classification: "NaturalBreaks".into(),
            classes: 5,
            page_template: "ANSI_A".into(),
            resolution_dpi: 300,
            spatial_reference: 4326,
            x_field: "lon".into(),
            y_field: "lat".into(),
        }
    }
}

/// Everything a host needs to turn the station CSV into a map file.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRequest {
    pub csv_path: PathBuf,
    pub output_path: PathBuf,
    pub format: ExportFormat,
    pub feature_class: String,
    pub map_name: String,
    pub layout_name: String,
    pub title: String,
    pub style: MapStyle,
}

/// Abstraction over a GIS application able to render and export a layout.
#[async_trait::async_trait]
pub trait MapHost: Send + Sync {
    /// Human-readable host description for logs.
    fn describe(&self) -> String;

    /// Builds the styled layout and exports it, returning the written file.
    async fn export(&self, request: &MapRequest) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_parsing() {
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_eq!("jpeg".parse::<ExportFormat>().unwrap(), ExportFormat::Jpg);
        assert!("tiff".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Png.to_string(), "png");
    }

    #[test]
    fn test_default_style() {
        let style = MapStyle::default();
        assert_eq!(style.field, "utilization_rate");
        assert_eq!(style.classes, 5);
        assert_eq!(style.resolution_dpi, 300);
    }
}
