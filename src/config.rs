//! Runtime configuration, read from the environment (and `.env` via dotenvy).

use std::path::PathBuf;

pub const DEFAULT_GBFS_BASE_URL: &str = "https://gbfs.velobixi.com/gbfs";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// GBFS root URL, or a local directory holding an archived snapshot.
    pub gbfs_base_url: String,
    pub gbfs_language: String,

    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,

    /// Interpreter of the GIS host (ArcGIS Pro's `propy`).
    pub arcgis_python: Option<PathBuf>,
    pub arcgis_project: Option<PathBuf>,
    pub map_name: String,
    pub layout_name: String,

    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_file_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Settings {
            gbfs_base_url: or("GBFS_BASE_URL", DEFAULT_GBFS_BASE_URL),
            gbfs_language: or("GBFS_LANGUAGE", "en"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            openai_base_url: or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            arcgis_python: get("ARCGIS_PYTHON").map(PathBuf::from),
            arcgis_project: get("ARCGIS_PRO_PROJECT_PATH").map(PathBuf::from),
            map_name: or("OUTPUT_MAP_NAME", "Bikeshare_Analysis_Map"),
            layout_name: or("OUTPUT_LAYOUT_NAME", "Bikeshare_Layout"),
            data_dir: PathBuf::from(or("DATA_DIR", "data")),
            output_dir: PathBuf::from(or("OUTPUT_DIR", "output")),
            log_file_path: PathBuf::from(or("LOG_FILE_PATH", "logs/bikeshare_pipeline.log")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]);
        assert_eq!(s.gbfs_base_url, DEFAULT_GBFS_BASE_URL);
        assert_eq!(s.gbfs_language, "en");
        assert_eq!(s.openai_model, "gpt-4o-mini");
        assert_eq!(s.openai_api_key, None);
        assert_eq!(s.arcgis_python, None);
        assert_eq!(s.data_dir, PathBuf::from("data"));
        assert_eq!(s.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn test_empty_key_counts_as_unset() {
        let s = settings(&[("OPENAI_API_KEY", "  "), ("OPENAI_MODEL", "")]);
        assert_eq!(s.openai_api_key, None);
        assert_eq!(s.openai_model, DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("OPENAI_API_KEY", "sk-abc"),
            ("GBFS_BASE_URL", "fixtures/gbfs"),
            ("ARCGIS_PRO_PROJECT_PATH", "C:/maps/bikes.aprx"),
        ]);
        assert_eq!(s.openai_api_key.as_deref(), Some("sk-abc"));
        assert_eq!(s.gbfs_base_url, "fixtures/gbfs");
        assert_eq!(s.arcgis_project, Some(PathBuf::from("C:/maps/bikes.aprx")));
    }
}
