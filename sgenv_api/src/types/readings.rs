use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_timestamp, GeoPoint};

/// Envelope shared by the station-based real-time feeds: rainfall,
/// wind speed, wind direction, relative humidity, and air temperature.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StationReadingsResponse {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub data: Option<StationReadingsData>,
    #[serde(default)]
    pub error_msg: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StationReadingsData {
    #[serde(default)]
    pub stations: Vec<Station>,
    #[serde(default)]
    pub readings: Vec<ReadingSet>,
    #[serde(default)]
    pub reading_type: Option<String>,
    #[serde(default)]
    pub reading_unit: Option<String>,
}

impl StationReadingsData {
    /// True when both the station list and at least one reading set are present.
    pub fn is_populated(&self) -> bool {
        !self.stations.is_empty() && !self.readings.is_empty()
    }

    /// The reading set with the newest parseable timestamp.
    pub fn latest_reading(&self) -> Option<&ReadingSet> {
        self.readings
            .iter()
            .filter_map(|r| r.parsed_timestamp().map(|ts| (ts, r)))
            .max_by_key(|(ts, _)| *ts)
            .map(|(_, r)| r)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// One upstream timestamp with a value per reporting station.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ReadingSet {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub data: Vec<StationValue>,
}

impl ReadingSet {
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Value reported by `station_id` in this set, if any.
    pub fn value_for(&self, station_id: &str) -> Option<f64> {
        self.data
            .iter()
            .find(|v| v.station_id == station_id)
            .and_then(|v| v.value)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StationValue {
    pub station_id: String,
    #[serde(default)]
    pub value: Option<f64>,
}
