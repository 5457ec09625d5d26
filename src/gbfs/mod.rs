//! Client for a GBFS (General Bikeshare Feed Specification) system.
//!
//! Every feed is fetched independently: a feed that cannot be retrieved or
//! decoded is logged and reported as unavailable, and the remaining feeds are
//! still fetched.

mod types;

pub use types::{
    Alert, AlertList, Envelope, StationInformation, StationList, StationStatus, SystemInformation,
};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::fetch::{HttpClient, fetch_bytes};
use crate::output::write_json;
use crate::parser::{parse_document, parse_feed};

/// The feeds this pipeline consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    StationInformation,
    StationStatus,
    SystemInformation,
    SystemAlerts,
}

impl Feed {
    pub const ALL: [Feed; 4] = [
        Feed::StationInformation,
        Feed::StationStatus,
        Feed::SystemInformation,
        Feed::SystemAlerts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feed::StationInformation => "station_information",
            Feed::StationStatus => "station_status",
            Feed::SystemInformation => "system_information",
            Feed::SystemAlerts => "system_alerts",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded feed together with the archived copy of its raw JSON.
#[derive(Debug)]
pub struct Fetched<T> {
    pub envelope: Envelope<T>,
    pub raw_path: PathBuf,
}

/// Everything retrieved in one fetch cycle.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub information: Option<Vec<StationInformation>>,
    pub status: Option<Vec<StationStatus>>,
    pub system: Option<SystemInformation>,
    pub alerts: Option<Vec<Alert>>,
    pub unavailable: Vec<Feed>,
    pub raw_files: Vec<PathBuf>,
}

impl Snapshot {
    fn record<T>(&mut self, feed: Feed, fetched: Option<Fetched<T>>) -> Option<T> {
        match fetched {
            Some(f) => {
                self.raw_files.push(f.raw_path);
                Some(f.envelope.data)
            }
            None => {
                self.unavailable.push(feed);
                None
            }
        }
    }
}

pub struct GbfsClient<C> {
    client: C,
    base: String,
    language: String,
}

impl<C: HttpClient> GbfsClient<C> {
    /// `base` is either an `http(s)://` root or a local directory laid out the
    /// same way (`{base}/{language}/{feed}.json`).
    pub fn new(client: C, base: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
            language: language.into(),
        }
    }

    pub fn location(&self, feed: Feed) -> String {
        format!(
            "{}/{}/{}.json",
            self.base.trim_end_matches('/'),
            self.language,
            feed.name()
        )
    }

    fn is_remote(&self) -> bool {
        self.base.starts_with("http")
    }

    /// Loads one feed's raw bytes over HTTP or from disk.
    #[tracing::instrument(skip(self, feed), fields(feed = %feed))]
    pub async fn fetch_raw(&self, feed: Feed) -> Result<Vec<u8>> {
        let location = self.location(feed);
        let bytes = if self.is_remote() {
            fetch_bytes(&self.client, &location).await?
        } else {
            tokio::fs::read(&location)
                .await
                .with_context(|| format!("cannot read {location}"))?
        };
        debug!(bytes = bytes.len(), "Feed bytes received");
        Ok(bytes)
    }

    /// Fetches, archives and decodes one feed.
    ///
    /// Returns `Ok(None)` when the feed is unreachable or malformed. Only a
    /// failure to write the archive copy is returned as an error.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        feed: Feed,
        archive_dir: &Path,
        stamp: &str,
    ) -> Result<Option<Fetched<T>>> {
        let bytes = match self.fetch_raw(feed).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(feed = %feed, error = %e, "Feed unavailable, skipping");
                return Ok(None);
            }
        };

        let document = match parse_document(&bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(feed = %feed, error = %e, "Feed body unreadable, skipping");
                return Ok(None);
            }
        };

        let envelope = match parse_feed(&document) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(feed = %feed, error = %e, "Feed schema mismatch, skipping");
                return Ok(None);
            }
        };

        let raw_path = archive_dir.join(format!("{}_{}.json", feed.name(), stamp));
        write_json(&raw_path, &document)?;
        Ok(Some(Fetched { envelope, raw_path }))
    }

    /// Fetches all feeds in a fixed order.
    #[tracing::instrument(skip(self, archive_dir), fields(base = %self.base))]
    pub async fn snapshot(&self, archive_dir: &Path, stamp: &str) -> Result<Snapshot> {
        let mut snap = Snapshot::default();

        let fetched = self
            .fetch::<StationList<StationInformation>>(Feed::StationInformation, archive_dir, stamp)
            .await?;
        snap.information = snap
            .record(Feed::StationInformation, fetched)
            .map(|list| list.stations);

        let fetched = self
            .fetch::<StationList<StationStatus>>(Feed::StationStatus, archive_dir, stamp)
            .await?;
        snap.status = snap
            .record(Feed::StationStatus, fetched)
            .map(|list| list.stations);

        let fetched = self
            .fetch::<SystemInformation>(Feed::SystemInformation, archive_dir, stamp)
            .await?;
        snap.system = snap.record(Feed::SystemInformation, fetched);

        let fetched = self
            .fetch::<AlertList>(Feed::SystemAlerts, archive_dir, stamp)
            .await?;
        snap.alerts = snap
            .record(Feed::SystemAlerts, fetched)
            .map(|list| list.alerts);

        info!(
            stations = snap.information.as_ref().map_or(0, Vec::len),
            statuses = snap.status.as_ref().map_or(0, Vec::len),
            alerts = snap.alerts.as_ref().map_or(0, Vec::len),
            unavailable = snap.unavailable.len(),
            "Feed snapshot complete"
        );

        Ok(snap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use crate::fetch::testing::CannedClient;
    use std::fs;

    const STATUS: &str = r#"{"last_updated": 1, "ttl": 0, "data": {"stations": [
        {"station_id": "1", "num_bikes_available": 4, "num_docks_available": 6}
    ]}}"#;

    fn fixture_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("en")).unwrap();
        for (name, body) in files {
            fs::write(dir.path().join("en").join(name), body).unwrap();
        }
        dir
    }

    #[test]
    fn test_location_layout() {
        let client = GbfsClient::new(BasicClient::new(), "https://gbfs.example.org/gbfs/", "fr");
        assert_eq!(
            client.location(Feed::StationStatus),
            "https://gbfs.example.org/gbfs/fr/station_status.json"
        );
    }

    #[tokio::test]
    async fn test_fetch_over_http_archives_raw_json() {
        let archive = tempfile::tempdir().unwrap();
        let client = GbfsClient::new(CannedClient::new(200, STATUS), "https://gbfs.example.org", "en");

        let fetched = client
            .fetch::<StationList<StationStatus>>(Feed::StationStatus, archive.path(), "20240101_000000")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fetched.envelope.data.stations.len(), 1);
        assert!(fetched.raw_path.ends_with("station_status_20240101_000000.json"));
        assert!(fetched.raw_path.exists());
    }

    #[tokio::test]
    async fn test_http_error_marks_feed_unavailable() {
        let archive = tempfile::tempdir().unwrap();
        let client = GbfsClient::new(CannedClient::new(404, "missing"), "https://gbfs.example.org", "en");

        let fetched = client
            .fetch::<AlertList>(Feed::SystemAlerts, archive.path(), "s")
            .await
            .unwrap();

        assert!(fetched.is_none());
        assert_eq!(fs::read_dir(archive.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_from_directory_tolerates_missing_feeds() {
        let dir = fixture_dir(&[("station_status.json", STATUS)]);
        let archive = tempfile::tempdir().unwrap();
        let client = GbfsClient::new(BasicClient::new(), dir.path().to_string_lossy(), "en");

        let snap = client.snapshot(archive.path(), "s").await.unwrap();

        assert!(snap.information.is_none());
        assert_eq!(snap.status.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            snap.unavailable,
            vec![Feed::StationInformation, Feed::SystemInformation, Feed::SystemAlerts]
        );
        assert_eq!(snap.raw_files.len(), 1);
    }

    #[tokio::test]
    async fn test_null_count_keeps_the_rest_of_the_feed() {
        let body = r#"{"last_updated": 1, "ttl": 0, "data": {"stations": [
            {"station_id": "1", "num_bikes_available": 4, "num_docks_available": 6},
            {"station_id": "2", "num_bikes_available": null, "num_docks_available": -1}
        ]}}"#;
        let archive = tempfile::tempdir().unwrap();
        let client = GbfsClient::new(CannedClient::new(200, body), "https://gbfs.example.org", "en");

        let fetched = client
            .fetch::<StationList<StationStatus>>(Feed::StationStatus, archive.path(), "s")
            .await
            .unwrap()
            .unwrap();

        let stations = &fetched.envelope.data.stations;
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1].station_id, "2");
        assert_eq!(stations[1].num_bikes_available, 0);
        assert_eq!(stations[1].num_docks_available, 0);
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_not_archived() {
        let dir = fixture_dir(&[("station_information.json", r#"{"data": {"alerts": []}}"#)]);
        let archive = tempfile::tempdir().unwrap();
        let client = GbfsClient::new(BasicClient::new(), dir.path().to_string_lossy(), "en");

        let snap = client.snapshot(archive.path(), "s").await.unwrap();

        assert!(snap.unavailable.contains(&Feed::StationInformation));
        assert!(snap.raw_files.is_empty());
        assert_eq!(fs::read_dir(archive.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_feed_is_skipped() {
        let dir = fixture_dir(&[("system_alerts.json", "{not json")]);
        let archive = tempfile::tempdir().unwrap();
        let client = GbfsClient::new(BasicClient::new(), dir.path().to_string_lossy(), "en");

        let fetched = client
            .fetch::<AlertList>(Feed::SystemAlerts, archive.path(), "s")
            .await
            .unwrap();
        assert!(fetched.is_none());
    }
}
