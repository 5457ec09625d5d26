//! GBFS payload types.
//!
//! Field shapes differ between GBFS v1, v2 and v3 feeds in the wild, so the
//! deserializers in [`de`] accept each of the known encodings.

use serde::Deserialize;

/// The wrapper every GBFS file shares.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, deserialize_with = "de::opt_timestamp")]
    pub last_updated: Option<i64>,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub version: Option<String>,
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationList<T> {
    pub stations: Vec<T>,
}

/// Static station metadata from `station_information`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationInformation {
    #[serde(deserialize_with = "de::id")]
    pub station_id: String,
    #[serde(deserialize_with = "de::text")]
    pub name: String,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub short_name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, deserialize_with = "de::opt_count")]
    pub capacity: Option<u32>,
}

/// Live counts from `station_status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationStatus {
    #[serde(deserialize_with = "de::id")]
    pub station_id: String,
    #[serde(default, deserialize_with = "de::count")]
    pub num_bikes_available: u32,
    #[serde(default, deserialize_with = "de::opt_count")]
    pub num_ebikes_available: Option<u32>,
    #[serde(default, deserialize_with = "de::count")]
    pub num_docks_available: u32,
    #[serde(default, deserialize_with = "de::opt_flag")]
    pub is_installed: Option<bool>,
    #[serde(default, deserialize_with = "de::opt_flag")]
    pub is_renting: Option<bool>,
    #[serde(default, deserialize_with = "de::opt_flag")]
    pub is_returning: Option<bool>,
    #[serde(default, deserialize_with = "de::opt_timestamp")]
    pub last_reported: Option<i64>,
}

/// Operator details from `system_information`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SystemInformation {
    #[serde(deserialize_with = "de::id")]
    pub system_id: String,
    #[serde(deserialize_with = "de::text")]
    pub name: String,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub operator: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertList {
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

/// One entry of `system_alerts`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Alert {
    #[serde(deserialize_with = "de::id")]
    pub alert_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "de::text")]
    pub summary: String,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub description: Option<String>,
    #[serde(default)]
    pub station_ids: Vec<String>,
}

pub(crate) mod de {
    use chrono::DateTime;
    use serde::de::{Error, IgnoredAny};
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Int(i64),
        Float(f64),
        Text(String),
        Other(IgnoredAny),
    }

    impl Count {
        /// Negative values clamp to 0; unreadable values are dropped.
        fn value(self) -> Option<u32> {
            let n = match self {
                Count::Int(n) => n,
                Count::Float(f) if f.is_finite() => f as i64,
                Count::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite())? as i64,
                _ => return None,
            };
            Some(n.clamp(0, i64::from(u32::MAX)) as u32)
        }
    }

    #[derive(Deserialize)]
    struct Localized {
        text: String,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Plain(String),
        Localized(Vec<Localized>),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Timestamp {
        Epoch(i64),
        Rfc3339(String),
    }

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Id::deserialize(d)? {
            Id::Text(s) => s,
            Id::Int(n) => n.to_string(),
        })
    }

    pub fn opt_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(Option::<Flag>::deserialize(d)?.map(|f| match f {
            Flag::Bool(b) => b,
            Flag::Int(n) => n != 0,
        }))
    }

    /// A count that may be null, negative, fractional or quoted. Anything
    /// unreadable counts as 0.
    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(opt_count(d)?.unwrap_or(0))
    }

    pub fn opt_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(Option::<Count>::deserialize(d)?.and_then(Count::value))
    }

    fn flatten(t: Text) -> Option<String> {
        match t {
            Text::Plain(s) => Some(s),
            Text::Localized(items) => items.into_iter().next().map(|l| l.text),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        flatten(Text::deserialize(d)?).ok_or_else(|| D::Error::custom("empty localized text"))
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Text>::deserialize(d)?.and_then(flatten))
    }

    pub fn opt_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Option::<Timestamp>::deserialize(d)? {
            None => Ok(None),
            Some(Timestamp::Epoch(n)) => Ok(Some(n)),
            Some(Timestamp::Rfc3339(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|t| Some(t.timestamp()))
                .map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v2_station_information() {
        let json = r#"{
            "last_updated": 1700000000,
            "ttl": 10,
            "data": {"stations": [
                {"station_id": "7", "name": "Métro Mont-Royal", "lat": 45.52, "lon": -73.58, "capacity": 31}
            ]}
        }"#;
        let env: Envelope<StationList<StationInformation>> = serde_json::from_str(json).unwrap();

        assert_eq!(env.last_updated, Some(1700000000));
        let s = &env.data.stations[0];
        assert_eq!(s.station_id, "7");
        assert_eq!(s.name, "Métro Mont-Royal");
        assert_eq!(s.capacity, Some(31));
    }

    #[test]
    fn test_numeric_ids_and_integer_flags() {
        let json = r#"{"station_id": 42, "num_bikes_available": 3, "num_docks_available": 9,
                       "is_installed": 1, "is_renting": 0, "is_returning": true,
                       "last_reported": 1700000100}"#;
        let s: StationStatus = serde_json::from_str(json).unwrap();

        assert_eq!(s.station_id, "42");
        assert_eq!(s.is_installed, Some(true));
        assert_eq!(s.is_renting, Some(false));
        assert_eq!(s.is_returning, Some(true));
        assert_eq!(s.last_reported, Some(1700000100));
    }

    #[test]
    fn test_v3_localized_names_and_rfc3339_timestamps() {
        let json = r#"{"station_id": "a", "name": [{"text": "Central", "language": "en"}],
                       "lat": 1.0, "lon": 2.0}"#;
        let s: StationInformation = serde_json::from_str(json).unwrap();
        assert_eq!(s.name, "Central");
        assert_eq!(s.capacity, None);

        let json = r#"{"station_id": "a", "last_reported": "2023-11-14T22:13:20Z"}"#;
        let s: StationStatus = serde_json::from_str(json).unwrap();
        assert_eq!(s.last_reported, Some(1700000000));
        assert_eq!(s.num_bikes_available, 0);
    }

    #[test]
    fn test_unreadable_counts_fall_back() {
        let json = r#"{"station_id": "a", "num_bikes_available": null,
                       "num_ebikes_available": -2, "num_docks_available": "12",
                       "is_installed": 1}"#;
        let s: StationStatus = serde_json::from_str(json).unwrap();
        assert_eq!(s.num_bikes_available, 0);
        assert_eq!(s.num_ebikes_available, Some(0));
        assert_eq!(s.num_docks_available, 12);

        let json = r#"{"station_id": "b", "num_bikes_available": -5,
                       "num_ebikes_available": null, "num_docks_available": {"n": 1}}"#;
        let s: StationStatus = serde_json::from_str(json).unwrap();
        assert_eq!(s.num_bikes_available, 0);
        assert_eq!(s.num_ebikes_available, None);
        assert_eq!(s.num_docks_available, 0);

        let json = r#"{"station_id": "c", "name": "x", "lat": 1.0, "lon": 2.0, "capacity": 19.0}"#;
        let s: StationInformation = serde_json::from_str(json).unwrap();
        assert_eq!(s.capacity, Some(19));
    }

    #[test]
    fn test_alert_type_field() {
        let json = r#"{"alerts": [{"alert_id": "1", "type": "STATION_CLOSURE",
                       "summary": "Closed", "station_ids": ["7"]}]}"#;
        let list: AlertList = serde_json::from_str(json).unwrap();
        assert_eq!(list.alerts[0].kind, "STATION_CLOSURE");
        assert_eq!(list.alerts[0].station_ids, vec!["7".to_string()]);
    }

    #[test]
    fn test_missing_coordinates_fail() {
        let json = r#"{"station_id": "a", "name": "x"}"#;
        assert!(serde_json::from_str::<StationInformation>(json).is_err());
    }
}
