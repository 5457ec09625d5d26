use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use super::script;
use crate::config::Settings;
use crate::error::StageError;
use crate::services::map_host::{MapHost, MapRequest};

/// Where ArcGIS Pro installs its Python launcher by default.
const DEFAULT_PROPY: &str = r"C:\Program Files\ArcGIS\Pro\bin\Python\Scripts\propy.bat";

/// Drives ArcGIS Pro's bundled Python runtime as a subprocess.
///
/// arcpy only exists inside that runtime, so the map is produced by writing
/// an arcpy script next to the export and running it with `propy`.
#[derive(Debug, Clone)]
pub struct ArcGisProHost {
    python: PathBuf,
    project: PathBuf,
}

impl ArcGisProHost {
    /// Locates the interpreter and project, failing with
    /// [`StageError::HostUnavailable`] when either is missing.
    pub fn detect(python: Option<&Path>, project: Option<&Path>) -> Result<Self, StageError> {
        let python = python
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROPY));
        if !python.is_file() {
            return Err(StageError::HostUnavailable(format!(
                "ArcGIS Pro Python not found at {}",
                python.display()
            )));
        }

        let project = project.ok_or_else(|| {
            StageError::HostUnavailable("ARCGIS_PRO_PROJECT_PATH is not set".to_string())
        })?;
        if !project.is_file() {
            return Err(StageError::HostUnavailable(format!(
                "ArcGIS Pro project not found at {}",
                project.display()
            )));
        }

        Ok(Self {
            python,
            project: project.to_path_buf(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, StageError> {
        Self::detect(
            settings.arcgis_python.as_deref(),
            settings.arcgis_project.as_deref(),
        )
    }
}

#[async_trait]
impl MapHost for ArcGisProHost {
    fn describe(&self) -> String {
        format!(
            "ArcGIS Pro ({}, project {})",
            self.python.display(),
            self.project.display()
        )
    }

    #[tracing::instrument(skip(self, request), fields(output = %request.output_path.display()))]
    async fn export(&self, request: &MapRequest) -> Result<PathBuf> {
        let body = script::render(request, &self.project)?;
        let script_path = request.output_path.with_extension("py");
        tokio::fs::write(&script_path, body)
            .await
            .with_context(|| format!("cannot write {}", script_path.display()))?;
        debug!(script = %script_path.display(), "Export script written");

        let output = Command::new(&self.python)
            .arg(&script_path)
            .output()
            .await
            .with_context(|| format!("failed to launch {}", self.python.display()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "map export script exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        let exported = script::exported_path(&stdout)
            .map(PathBuf::from)
            .unwrap_or_else(|| request.output_path.clone());
        info!(path = %exported.display(), "Map exported");
        Ok(exported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_interpreter_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let result = ArcGisProHost::detect(Some(dir.path().join("propy.bat").as_path()), None);
        assert!(matches!(result, Err(StageError::HostUnavailable(_))));
    }

    #[test]
    fn test_missing_project_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let python = dir.path().join("propy");
        fs::write(&python, "").unwrap();

        let result = ArcGisProHost::detect(Some(python.as_path()), None);
        assert!(matches!(result, Err(StageError::HostUnavailable(m)) if m.contains("ARCGIS_PRO_PROJECT_PATH")));

        let result = ArcGisProHost::detect(Some(python.as_path()), Some(dir.path().join("none.aprx").as_path()));
        assert!(matches!(result, Err(StageError::HostUnavailable(_))));
    }

    #[test]
    fn test_detect_with_both_present() {
        let dir = tempfile::tempdir().unwrap();
        let python = dir.path().join("propy");
        let project = dir.path().join("bikes.aprx");
        fs::write(&python, "").unwrap();
        fs::write(&project, "").unwrap();

        let host = ArcGisProHost::detect(Some(python.as_path()), Some(project.as_path())).unwrap();
        assert!(host.describe().contains("bikes.aprx"));
    }
}
