//! Output records handed to dashboard callers.
//!
//! Every aggregator returns these shapes whether the data came from a live
//! feed or from the bundled snapshot. Absent values are `None`, never a
//! sentinel number.

use serde::{Deserialize, Serialize};
use sgenv_api::types::GeoPoint;

use crate::geo::Located;
use crate::risk::{estimate_flood_risk, FloodRisk, FloodRiskOptions};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components are finite numbers.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl From<GeoPoint> for LatLng {
    fn from(p: GeoPoint) -> Self {
        Self {
            lat: p.latitude,
            lng: p.longitude,
        }
    }
}

/// One rainfall station as shown on the dashboard.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    pub id: String,
    pub name: String,
    pub location: Option<LatLng>,
    /// Latest 5-minute total in mm.
    pub rainfall: Option<f64>,
    /// Accumulated total over the last hour in mm.
    pub last_hour: Option<f64>,
    /// Minutes of observed data behind `last_hour`, 0..=60.
    pub coverage_minutes: u32,
    pub distance_km: Option<f64>,
}

impl StationRecord {
    /// Flood risk for this station, gating on its own coverage.
    pub fn flood_risk(&self, opts: &FloodRiskOptions) -> Option<FloodRisk> {
        let opts = FloodRiskOptions {
            coverage_minutes: Some(self.coverage_minutes),
            ..*opts
        };
        estimate_flood_risk(self.rainfall, self.last_hour, &opts)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RainfallData {
    pub stations: Vec<StationRecord>,
    pub timestamp: Option<String>,
}

/// Regional one-hour PM2.5 reading.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Pm25Reading {
    pub name: String,
    pub location: Option<LatLng>,
    pub value: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WindReading {
    pub id: String,
    pub name: String,
    pub location: Option<LatLng>,
    /// Knots.
    pub speed: Option<f64>,
    /// Degrees from north.
    pub direction: Option<f64>,
}

/// Single-valued station reading (humidity in %, temperature in °C).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub id: String,
    pub name: String,
    pub location: Option<LatLng>,
    pub value: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AreaForecast {
    pub area: String,
    pub forecast: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ForecastArea {
    pub name: String,
    pub location: Option<LatLng>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForecastData {
    pub forecasts: Vec<AreaForecast>,
    pub metadata: Vec<ForecastArea>,
    pub timestamp: Option<String>,
    pub valid_period: Option<String>,
}

impl ForecastData {
    /// Forecast text for `area`, matched case-insensitively.
    pub fn forecast_for(&self, area: &str) -> Option<&str> {
        self.forecasts
            .iter()
            .find(|f| f.area.eq_ignore_ascii_case(area))
            .map(|f| f.forecast.as_str())
    }
}

impl Located for StationRecord {
    fn location(&self) -> Option<LatLng> {
        self.location
    }
}

impl Located for Pm25Reading {
    fn location(&self) -> Option<LatLng> {
        self.location
    }
}

impl Located for WindReading {
    fn location(&self) -> Option<LatLng> {
        self.location
    }
}

impl Located for SensorReading {
    fn location(&self) -> Option<LatLng> {
        self.location
    }
}

impl Located for ForecastArea {
    fn location(&self) -> Option<LatLng> {
        self.location
    }
}
