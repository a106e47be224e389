//! Bundled static snapshot used when live feeds are unavailable.
//!
//! The document has one top-level key per feed (`rain`, `pm25`, `wind`,
//! `humidity`, `temp`, `twoHr` or `forecasts`). Each feed may be stored in
//! the live-normalized shape or as a legacy flat array, and a malformed
//! feed only blanks that feed rather than the whole document.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::EnvError;
use crate::model::{
    AreaForecast, ForecastArea, ForecastData, LatLng, Pm25Reading, RainfallData, SensorReading,
    StationRecord, WindReading,
};

/// Snapshot compiled into the binary.
pub const BUNDLED_SNAPSHOT: &str = include_str!("../../seed_data/env_snapshot.json");

/// Where the snapshot document comes from.
#[derive(Debug, Clone, Default)]
pub enum SnapshotSource {
    #[default]
    Bundled,
    Json(String),
    File(PathBuf),
}

impl SnapshotSource {
    fn describe(&self) -> String {
        match self {
            Self::Bundled => "bundled".to_string(),
            Self::Json(_) => "inline".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Deserializes a field, substituting `None` if it does not fit `T`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct SnapshotLocation {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "lon", alias = "longitude")]
    pub lng: f64,
}

/// Union of every per-record field any feed uses, in either shape.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    #[serde(default, alias = "stationId")]
    pub id: Option<String>,
    #[serde(default, alias = "region", alias = "area")]
    pub name: Option<String>,
    #[serde(default, alias = "labelLocation", alias = "label_location", deserialize_with = "lenient")]
    pub location: Option<SnapshotLocation>,
    #[serde(default, alias = "latitude")]
    pub lat: Option<f64>,
    #[serde(default, alias = "lon", alias = "longitude")]
    pub lng: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub rainfall: Option<f64>,
    #[serde(default)]
    pub last_hour: Option<f64>,
    #[serde(default)]
    pub coverage_minutes: Option<u32>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub direction: Option<f64>,
    #[serde(default)]
    pub forecast: Option<String>,
}

impl SnapshotRecord {
    fn location(&self) -> Option<LatLng> {
        match (self.location, self.lat, self.lng) {
            (Some(loc), _, _) => Some(LatLng::new(loc.lat, loc.lng)),
            (None, Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
            _ => None,
        }
    }

    fn name(&self) -> String {
        self.name.clone().or_else(|| self.id.clone()).unwrap_or_default()
    }

    fn id(&self) -> String {
        self.id.clone().or_else(|| self.name.clone()).unwrap_or_default()
    }

    fn to_station(&self) -> StationRecord {
        StationRecord {
            id: self.id(),
            name: self.name(),
            location: self.location(),
            rainfall: self.rainfall.or(self.value),
            last_hour: self.last_hour,
            coverage_minutes: self.coverage_minutes.unwrap_or(0).min(60),
            distance_km: None,
        }
    }

    fn to_sensor(&self) -> SensorReading {
        SensorReading {
            id: self.id(),
            name: self.name(),
            location: self.location(),
            value: self.value,
        }
    }
}

/// A feed stored as a bare array or wrapped in an object.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum RecordList {
    Flat(Vec<SnapshotRecord>),
    Wrapped {
        #[serde(alias = "stations", alias = "readings")]
        items: Vec<SnapshotRecord>,
    },
}

impl RecordList {
    pub fn records(&self) -> &[SnapshotRecord] {
        match self {
            Self::Flat(items) | Self::Wrapped { items } => items,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum RainSnapshot {
    Normalized {
        stations: Vec<SnapshotRecord>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    Legacy(Vec<SnapshotRecord>),
}

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ForecastSnapshot {
    Normalized {
        #[serde(default)]
        forecasts: Vec<SnapshotRecord>,
        #[serde(default)]
        metadata: Vec<SnapshotRecord>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    Legacy(Vec<SnapshotRecord>),
}

impl ForecastSnapshot {
    fn to_forecast(&self) -> ForecastData {
        let (forecasts, metadata, timestamp) = match self {
            Self::Normalized {
                forecasts,
                metadata,
                timestamp,
            } => (forecasts.as_slice(), metadata.as_slice(), timestamp.clone()),
            Self::Legacy(forecasts) => (forecasts.as_slice(), &[][..], None),
        };

        let forecasts = forecasts
            .iter()
            .filter_map(|r| {
                Some(AreaForecast {
                    area: r.name.clone()?,
                    forecast: r.forecast.clone().unwrap_or_default(),
                })
            })
            .collect();
        // Legacy arrays carry positions inline with the forecast.
        let metadata_source = if metadata.is_empty() {
            match self {
                Self::Legacy(items) => items.as_slice(),
                Self::Normalized { .. } => metadata,
            }
        } else {
            metadata
        };
        let metadata = metadata_source
            .iter()
            .filter(|r| r.location().is_some())
            .map(|r| ForecastArea {
                name: r.name(),
                location: r.location(),
            })
            .collect();

        ForecastData {
            forecasts,
            metadata,
            timestamp,
            valid_period: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDataset {
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub rain: Option<RainSnapshot>,
    #[serde(default, deserialize_with = "lenient")]
    pub pm25: Option<RecordList>,
    #[serde(default, deserialize_with = "lenient")]
    pub wind: Option<RecordList>,
    #[serde(default, deserialize_with = "lenient")]
    pub humidity: Option<RecordList>,
    #[serde(default, alias = "temperature", deserialize_with = "lenient")]
    pub temp: Option<RecordList>,
    #[serde(default, deserialize_with = "lenient")]
    pub two_hr: Option<ForecastSnapshot>,
    #[serde(default, deserialize_with = "lenient")]
    pub forecasts: Option<ForecastSnapshot>,
}

/// Summary of what the loaded snapshot can serve.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDebugInfo {
    pub source: String,
    pub generated_at: Option<String>,
    pub rain_stations: usize,
    pub pm25_regions: usize,
    pub wind_stations: usize,
    pub humidity_stations: usize,
    pub temperature_stations: usize,
    pub forecast_areas: usize,
}

impl SnapshotDataset {
    pub fn from_json_str(content: &str) -> Result<Self, EnvError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(source: &SnapshotSource) -> Result<Self, EnvError> {
        match source {
            SnapshotSource::Bundled => Self::from_json_str(BUNDLED_SNAPSHOT),
            SnapshotSource::Json(content) => Self::from_json_str(content),
            SnapshotSource::File(path) => {
                let content = std::fs::read_to_string(path)?;
                Self::from_json_str(&content)
            }
        }
    }

    pub fn rainfall(&self) -> RainfallData {
        match &self.rain {
            Some(RainSnapshot::Normalized {
                stations,
                timestamp,
            }) => RainfallData {
                stations: stations.iter().map(SnapshotRecord::to_station).collect(),
                timestamp: timestamp.clone().or_else(|| self.generated_at.clone()),
            },
            Some(RainSnapshot::Legacy(stations)) => RainfallData {
                stations: stations.iter().map(SnapshotRecord::to_station).collect(),
                timestamp: self.generated_at.clone(),
            },
            None => RainfallData::default(),
        }
    }

    pub fn pm25(&self) -> Vec<Pm25Reading> {
        records(&self.pm25)
            .iter()
            .map(|r| Pm25Reading {
                name: r.name(),
                location: r.location(),
                value: r.value,
            })
            .collect()
    }

    pub fn wind(&self) -> Vec<WindReading> {
        records(&self.wind)
            .iter()
            .map(|r| WindReading {
                id: r.id(),
                name: r.name(),
                location: r.location(),
                speed: r.speed.or(r.value),
                direction: r.direction,
            })
            .collect()
    }

    pub fn humidity(&self) -> Vec<SensorReading> {
        records(&self.humidity)
            .iter()
            .map(SnapshotRecord::to_sensor)
            .collect()
    }

    pub fn temperature(&self) -> Vec<SensorReading> {
        records(&self.temp)
            .iter()
            .map(SnapshotRecord::to_sensor)
            .collect()
    }

    /// Prefers `twoHr`, falling back to a top-level `forecasts` entry.
    pub fn forecast(&self) -> ForecastData {
        let mut data = self
            .two_hr
            .as_ref()
            .or(self.forecasts.as_ref())
            .map(ForecastSnapshot::to_forecast)
            .unwrap_or_default();
        if data.timestamp.is_none() {
            data.timestamp = self.generated_at.clone();
        }
        data
    }

    pub fn debug_info(&self, source: &SnapshotSource) -> SnapshotDebugInfo {
        let forecast = self.forecast();
        SnapshotDebugInfo {
            source: source.describe(),
            generated_at: self.generated_at.clone(),
            rain_stations: self.rainfall().stations.len(),
            pm25_regions: records(&self.pm25).len(),
            wind_stations: records(&self.wind).len(),
            humidity_stations: records(&self.humidity).len(),
            temperature_stations: records(&self.temp).len(),
            forecast_areas: forecast.forecasts.len(),
        }
    }
}

fn records(list: &Option<RecordList>) -> &[SnapshotRecord] {
    list.as_ref().map(RecordList::records).unwrap_or(&[])
}
