//! Rendering of the arcpy export script.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::services::map_host::MapRequest;

const TEMPLATE: &str = include_str!("export_map.py");

/// Prefix of the stdout line carrying the exported file path.
pub const EXPORTED_MARKER: &str = "EXPORTED:";

/// JSON string and number literals are valid Python literals, so every
/// substitution goes through `serde_json`.
fn literal(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn path_literal(path: &Path) -> Result<String> {
    literal(&path.to_string_lossy())
}

/// Fills the export script template for one request.
pub fn render(request: &MapRequest, project: &Path) -> Result<String> {
    let style = &request.style;
    let substitutions = [
        ("CSV_PATH", path_literal(&request.csv_path)?),
        ("OUTPUT_PATH", path_literal(&request.output_path)?),
        ("OUTPUT_FORMAT", literal(&request.format)?),
        ("PROJECT_PATH", path_literal(project)?),
        ("FEATURE_CLASS", literal(&request.feature_class)?),
        ("MAP_NAME", literal(&request.map_name)?),
        ("LAYOUT_NAME", literal(&request.layout_name)?),
        ("TITLE", literal(&request.title)?),
        ("FIELD", literal(&style.field)?),
        ("COLOR_RAMP", literal(&style.color_ramp)?),
        ("CLASSIFICATION", literal(&style.classification)?),
        ("CLASSES", literal(&style.classes)?),
        ("RESOLUTION", literal(&style.resolution_dpi)?),
        ("WKID", literal(&style.spatial_reference)?),
        ("X_FIELD", literal(&style.x_field)?),
        ("Y_FIELD", literal(&style.y_field)?),
        ("PAGE_TEMPLATE", literal(&style.page_template)?),
    ];

    let mut script = TEMPLATE.to_string();
    for (key, value) in substitutions {
        script = script.replace(&format!("{{{{{key}}}}}"), &value);
    }

    if let Some(start) = script.find("{{") {
        let end = script[start..].find("}}").map_or(script.len(), |e| start + e + 2);
        anyhow::bail!("unfilled placeholder in export script: {}", &script[start..end]);
    }
    Ok(script)
}

/// Pulls the exported path out of the script's stdout.
pub fn exported_path(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix(EXPORTED_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::map_host::{ExportFormat, MapStyle};
    use std::path::PathBuf;

    fn request() -> MapRequest {
        MapRequest {
            csv_path: PathBuf::from(r"C:\data\combined_stations.csv"),
            output_path: PathBuf::from(r"C:\output\map.png"),
            format: ExportFormat::Png,
            feature_class: "Bikeshare_Stations".into(),
            map_name: "Map".into(),
            layout_name: "Layout".into(),
            title: "Station \"Utilization\"".into(),
            style: MapStyle::default(),
        }
    }

    #[test]
    fn test_render_fills_every_placeholder() {
        let script = render(&request(), Path::new("C:/maps/bikes.aprx")).unwrap();

        assert!(!script.contains("{{"));
        assert!(script.contains(r#"CSV_PATH = "C:\\data\\combined_stations.csv""#));
        assert!(script.contains(r#"OUTPUT_FORMAT = "png""#));
        assert!(script.contains(r#"TITLE = "Station \"Utilization\"""#));
        assert!(script.contains("CLASSES = 5"));
        assert!(script.contains("RESOLUTION = 300"));
        assert!(script.contains(r#"PAGE_SIZES.get("ANSI_A""#));
    }

    #[test]
    fn test_exported_path_uses_last_marker() {
        let out = "loading\nEXPORTED:/tmp/a.pdf\nEXPORTED:/tmp/b.pdf\n";
        assert_eq!(exported_path(out), Some("/tmp/b.pdf"));
        assert_eq!(exported_path("nothing here"), None);
    }
}
