//! Resilient data layer for Singapore environmental sensor feeds.
//!
//! Wraps the `sgenv_api` transport with an in-memory TTL cache, in-flight
//! de-duplication, 429 handling, and an offline snapshot, and turns the raw
//! station readings into per-station rainfall, air quality, wind, humidity,
//! temperature, and forecast records.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod feeds;
pub mod geo;
pub mod inflight;
pub mod model;
pub mod rainfall;
pub mod risk;
pub mod rolling;
pub mod snapshot;
pub mod throttle;

pub use sgenv_api;
pub use sgenv_api::types;

pub use client::{AssumeOnline, ConnectivityProbe, FetchClient, FetchOptions};
pub use config::{EnvConfig, FeedKind};
pub use error::{EnvError, FetchError};
pub use feeds::{DataSource, EnvService, FeedOutcome};
pub use geo::{distance_km, nearest, nearest_forecast_area, Located};
pub use model::{
    AreaForecast, ForecastArea, ForecastData, LatLng, Pm25Reading, RainfallData, SensorReading,
    StationRecord, WindReading,
};
pub use risk::{estimate_flood_risk, FloodRisk, FloodRiskOptions, FloodThresholds};
pub use rolling::RollingRainBuffer;
pub use snapshot::{SnapshotDataset, SnapshotDebugInfo, SnapshotSource};
