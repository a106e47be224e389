//! Dataset aggregators: one entry point per feed.
//!
//! Each aggregator fetches through the shared [`FetchClient`], validates and
//! reshapes the payload, and on any failure serves the snapshot instead.
//! Aggregators never return an error; the [`FeedOutcome`] says where the
//! data came from.

use std::cmp::Ordering;
use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sgenv_api::types::{
    Pm25Response, StationReadingsData, StationReadingsResponse, TwoHourForecastResponse,
};
use sgenv_api::Client;

use crate::client::{AssumeOnline, ConnectivityProbe, FetchClient};
use crate::config::{EnvConfig, FeedKind};
use crate::error::{EnvError, FetchError};
use crate::geo::distance_between;
use crate::model::{
    AreaForecast, ForecastArea, ForecastData, LatLng, Pm25Reading, RainfallData, SensorReading,
    StationRecord, WindReading,
};
use crate::rainfall::{normalize_slots, window_span_minutes, window_total};
use crate::risk::FloodRiskOptions;
use crate::rolling::RollingRainBuffer;
use crate::snapshot::{SnapshotDataset, SnapshotDebugInfo, SnapshotSource};
use crate::throttle::WarnThrottle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Snapshot,
    None,
}

/// Result of one aggregator call.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome<T> {
    /// Fresh (or cached) upstream data.
    Live(T),
    /// Upstream failed; data comes from the snapshot.
    Fallback(T),
    /// Upstream failed and the snapshot has nothing for this feed.
    Empty,
}

impl<T: Default> FeedOutcome<T> {
    /// The payload, or an empty default for [`FeedOutcome::Empty`].
    pub fn into_inner(self) -> T {
        match self {
            Self::Live(data) | Self::Fallback(data) => data,
            Self::Empty => T::default(),
        }
    }
}

impl<T> FeedOutcome<T> {
    pub fn source(&self) -> DataSource {
        match self {
            Self::Live(_) => DataSource::Live,
            Self::Fallback(_) => DataSource::Snapshot,
            Self::Empty => DataSource::None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}

fn empty_payload(feed: FeedKind) -> FetchError {
    FetchError::EmptyPayload {
        label: feed.label().to_string(),
    }
}

fn fallback_outcome<T>(data: T, is_empty: bool) -> FeedOutcome<T> {
    if is_empty {
        FeedOutcome::Empty
    } else {
        FeedOutcome::Fallback(data)
    }
}

/// Fills `distance_km` and orders stations nearest first. Stations without
/// a usable location sort last in their original order.
fn with_distances(mut stations: Vec<StationRecord>, user: Option<LatLng>) -> Vec<StationRecord> {
    let Some(point) = user.filter(LatLng::is_valid) else {
        return stations;
    };
    for station in &mut stations {
        station.distance_km = station.location.and_then(|loc| distance_between(point, loc));
    }
    stations.sort_by(|a, b| match (a.distance_km, b.distance_km) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    stations
}

/// Long-lived owner of every piece of process-wide state: the fetch client
/// (cache and in-flight map), the rolling rainfall buffer, and the lazily
/// loaded snapshot. Build one at startup and share it by reference.
pub struct EnvService {
    config: EnvConfig,
    client: FetchClient,
    rolling: RollingRainBuffer,
    warnings: Arc<WarnThrottle>,
    snapshot_source: SnapshotSource,
    snapshot: OnceLock<Arc<SnapshotDataset>>,
}

impl EnvService {
    /// Creates a service against the production endpoints.
    pub fn new() -> Result<Self, EnvError> {
        Self::with_config(EnvConfig::default())
    }

    pub fn with_config(config: EnvConfig) -> Result<Self, EnvError> {
        Self::with_connectivity(config, Arc::new(AssumeOnline))
    }

    pub fn with_connectivity(
        config: EnvConfig,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Result<Self, EnvError> {
        let warnings = Arc::new(WarnThrottle::new(config.warn_window()));
        let client = FetchClient::with_probe(Client::new()?, probe, Arc::clone(&warnings));
        Ok(Self {
            config,
            client,
            rolling: RollingRainBuffer::new(),
            warnings,
            snapshot_source: SnapshotSource::default(),
            snapshot: OnceLock::new(),
        })
    }

    /// Replaces the snapshot source. Takes effect on the next snapshot read.
    pub fn with_snapshot_source(mut self, source: SnapshotSource) -> Self {
        self.snapshot_source = source;
        self.snapshot = OnceLock::new();
        self
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn client(&self) -> &FetchClient {
        &self.client
    }

    pub fn rolling(&self) -> &RollingRainBuffer {
        &self.rolling
    }

    /// Flood risk options carrying the configured thresholds.
    pub fn flood_options(&self) -> FloodRiskOptions {
        FloodRiskOptions::default().with_thresholds(self.config.flood)
    }

    /// The snapshot dataset, loaded on first use and kept for the process
    /// lifetime. An unreadable snapshot degrades to an empty dataset.
    pub fn load_env_datasets_from_file(&self) -> Arc<SnapshotDataset> {
        let dataset = self.snapshot.get_or_init(|| {
            match SnapshotDataset::load(&self.snapshot_source) {
                Ok(dataset) => Arc::new(dataset),
                Err(err) => {
                    tracing::warn!("snapshot unavailable, using empty dataset: {}", err);
                    Arc::new(SnapshotDataset::default())
                }
            }
        });
        Arc::clone(dataset)
    }

    pub fn snapshot_debug_info(&self) -> SnapshotDebugInfo {
        self.load_env_datasets_from_file()
            .debug_info(&self.snapshot_source)
    }

    async fn fetch_feed<T: DeserializeOwned>(&self, feed: FeedKind) -> Result<T, FetchError> {
        let value = self
            .client
            .fetch_json(
                &self.config.url(feed),
                feed.label(),
                self.config.fetch_options(feed),
            )
            .await?;
        T::deserialize(&*value).map_err(|e| FetchError::Malformed {
            label: feed.label().to_string(),
            message: e.to_string(),
        })
    }

    async fn fetch_station_feed(&self, feed: FeedKind) -> Result<StationReadingsData, FetchError> {
        let resp: StationReadingsResponse = self.fetch_feed(feed).await?;
        resp.data
            .filter(StationReadingsData::is_populated)
            .ok_or_else(|| empty_payload(feed))
    }

    fn note_failure(&self, feed: FeedKind, err: &FetchError) {
        // The fetch client has usually warned under the same label already.
        self.warnings.warn_fetch(err);
        tracing::debug!(label = feed.label(), "serving snapshot after: {}", err);
    }

    // -- 2-hour forecast ---------------------------------------------------

    pub async fn forecast(&self) -> FeedOutcome<ForecastData> {
        match self.live_forecast().await {
            Ok(data) => FeedOutcome::Live(data),
            Err(err) => {
                self.note_failure(FeedKind::Forecast, &err);
                let data = self.load_env_datasets_from_file().forecast();
                let is_empty = data.forecasts.is_empty();
                fallback_outcome(data, is_empty)
            }
        }
    }

    pub async fn fetch_weather_forecast(&self) -> ForecastData {
        self.forecast().await.into_inner()
    }

    async fn live_forecast(&self) -> Result<ForecastData, FetchError> {
        let feed = FeedKind::Forecast;
        let resp: TwoHourForecastResponse = self.fetch_feed(feed).await?;
        let data = resp.data.ok_or_else(|| empty_payload(feed))?;
        let item = data
            .latest_item()
            .filter(|item| !item.forecasts.is_empty())
            .ok_or_else(|| empty_payload(feed))?;

        Ok(ForecastData {
            forecasts: item
                .forecasts
                .iter()
                .map(|f| AreaForecast {
                    area: f.area.clone(),
                    forecast: f.forecast.as_str().to_string(),
                })
                .collect(),
            metadata: data
                .area_metadata
                .iter()
                .map(|a| ForecastArea {
                    name: a.name.clone(),
                    location: a.label_location.map(LatLng::from),
                })
                .collect(),
            timestamp: Some(item.timestamp.clone()).filter(|ts| !ts.is_empty()),
            valid_period: item.valid_period.as_ref().and_then(|p| p.text.clone()),
        })
    }

    // -- Rainfall ----------------------------------------------------------

    pub async fn rainfall(&self, user: Option<LatLng>) -> FeedOutcome<RainfallData> {
        match self.live_rainfall(user).await {
            Ok(data) => FeedOutcome::Live(data),
            Err(err) => {
                self.note_failure(FeedKind::Rainfall, &err);
                let mut data = self.load_env_datasets_from_file().rainfall();
                data.stations = with_distances(data.stations, user);
                let is_empty = data.stations.is_empty();
                fallback_outcome(data, is_empty)
            }
        }
    }

    pub async fn fetch_rainfall_data(&self, user: Option<LatLng>) -> RainfallData {
        self.rainfall(user).await.into_inner()
    }

    async fn live_rainfall(&self, user: Option<LatLng>) -> Result<RainfallData, FetchError> {
        let feed = FeedKind::Rainfall;
        let data = self.fetch_station_feed(feed).await?;
        let slots = normalize_slots(&data.readings);
        let latest = slots.first().ok_or_else(|| empty_payload(feed))?;

        for slot in slots.iter().rev() {
            for reading in &slot.reading.data {
                if let Some(value) = reading.value {
                    self.rolling.push(&reading.station_id, slot.timestamp, value);
                }
            }
        }

        // With a real window the last hour is summed directly; a lone slot
        // leans on history from earlier fetches.
        let strict = slots.len() >= 2;
        let span = window_span_minutes(&slots);
        let stations = data
            .stations
            .iter()
            .map(|station| {
                let (last_hour, coverage_minutes) = if strict {
                    (window_total(&slots, &station.id), span)
                } else {
                    (
                        self.rolling.sum_last_hour(&station.id, latest.timestamp),
                        self.rolling.coverage_minutes(&station.id, latest.timestamp),
                    )
                };
                StationRecord {
                    id: station.id.clone(),
                    name: station.name.clone(),
                    location: station.location.map(LatLng::from),
                    rainfall: latest.value_for(&station.id),
                    last_hour,
                    coverage_minutes,
                    distance_km: None,
                }
            })
            .collect();

        Ok(RainfallData {
            stations: with_distances(stations, user),
            timestamp: Some(latest.reading.timestamp.clone()),
        })
    }

    // -- PM2.5 -------------------------------------------------------------

    pub async fn pm25(&self) -> FeedOutcome<Vec<Pm25Reading>> {
        match self.live_pm25().await {
            Ok(data) => FeedOutcome::Live(data),
            Err(err) => {
                self.note_failure(FeedKind::Pm25, &err);
                let data = self.load_env_datasets_from_file().pm25();
                let is_empty = data.is_empty();
                fallback_outcome(data, is_empty)
            }
        }
    }

    pub async fn fetch_pm25_data(&self) -> Vec<Pm25Reading> {
        self.pm25().await.into_inner()
    }

    async fn live_pm25(&self) -> Result<Vec<Pm25Reading>, FetchError> {
        let feed = FeedKind::Pm25;
        let resp: Pm25Response = self.fetch_feed(feed).await?;
        let data = resp.data.ok_or_else(|| empty_payload(feed))?;
        let readings = data
            .latest_item()
            .map(|item| &item.readings.pm25_one_hourly)
            .filter(|readings| !readings.is_empty())
            .ok_or_else(|| empty_payload(feed))?;

        if data.region_metadata.is_empty() {
            let mut names: Vec<&String> = readings.keys().collect();
            names.sort();
            return Ok(names
                .into_iter()
                .map(|name| Pm25Reading {
                    name: name.clone(),
                    location: None,
                    value: readings.get(name).copied(),
                })
                .collect());
        }

        Ok(data
            .region_metadata
            .iter()
            .map(|region| Pm25Reading {
                name: region.name.clone(),
                location: region.label_location.map(LatLng::from),
                value: readings.get(&region.name).copied(),
            })
            .collect())
    }

    // -- Wind --------------------------------------------------------------

    pub async fn wind(&self) -> FeedOutcome<Vec<WindReading>> {
        match self.live_wind().await {
            Ok(data) => FeedOutcome::Live(data),
            Err(err) => {
                self.note_failure(FeedKind::WindSpeed, &err);
                let data = self.load_env_datasets_from_file().wind();
                let is_empty = data.is_empty();
                fallback_outcome(data, is_empty)
            }
        }
    }

    pub async fn fetch_wind_data(&self) -> Vec<WindReading> {
        self.wind().await.into_inner()
    }

    /// Speed is required; a failed direction feed leaves `direction` empty.
    async fn live_wind(&self) -> Result<Vec<WindReading>, FetchError> {
        let (speed, direction) = tokio::join!(
            self.fetch_station_feed(FeedKind::WindSpeed),
            self.fetch_station_feed(FeedKind::WindDirection),
        );
        let speed = speed?;
        let speed_latest = speed
            .latest_reading()
            .ok_or_else(|| empty_payload(FeedKind::WindSpeed))?;

        let direction = match direction {
            Ok(data) => data.latest_reading().cloned(),
            Err(err) => {
                self.warnings.warn_fetch(&err);
                None
            }
        };

        Ok(speed
            .stations
            .iter()
            .map(|station| WindReading {
                id: station.id.clone(),
                name: station.name.clone(),
                location: station.location.map(LatLng::from),
                speed: speed_latest
                    .value_for(&station.id)
                    .filter(|v| v.is_finite()),
                direction: direction
                    .as_ref()
                    .and_then(|d| d.value_for(&station.id))
                    .filter(|v| v.is_finite()),
            })
            .collect())
    }

    // -- Humidity / temperature ---------------------------------------------

    pub async fn humidity(&self) -> FeedOutcome<Vec<SensorReading>> {
        self.sensor(FeedKind::Humidity, SnapshotDataset::humidity)
            .await
    }

    pub async fn fetch_humidity_data(&self) -> Vec<SensorReading> {
        self.humidity().await.into_inner()
    }

    pub async fn temperature(&self) -> FeedOutcome<Vec<SensorReading>> {
        self.sensor(FeedKind::Temperature, SnapshotDataset::temperature)
            .await
    }

    pub async fn fetch_temperature_data(&self) -> Vec<SensorReading> {
        self.temperature().await.into_inner()
    }

    async fn sensor(
        &self,
        feed: FeedKind,
        from_snapshot: fn(&SnapshotDataset) -> Vec<SensorReading>,
    ) -> FeedOutcome<Vec<SensorReading>> {
        match self.live_sensor(feed).await {
            Ok(data) => FeedOutcome::Live(data),
            Err(err) => {
                self.note_failure(feed, &err);
                let data = from_snapshot(&*self.load_env_datasets_from_file());
                let is_empty = data.is_empty();
                fallback_outcome(data, is_empty)
            }
        }
    }

    async fn live_sensor(&self, feed: FeedKind) -> Result<Vec<SensorReading>, FetchError> {
        let data = self.fetch_station_feed(feed).await?;
        let latest = data.latest_reading().ok_or_else(|| empty_payload(feed))?;
        Ok(data
            .stations
            .iter()
            .map(|station| SensorReading {
                id: station.id.clone(),
                name: station.name.clone(),
                location: station.location.map(LatLng::from),
                value: latest.value_for(&station.id).filter(|v| v.is_finite()),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, location: Option<LatLng>) -> StationRecord {
        StationRecord {
            id: id.to_string(),
            name: id.to_string(),
            location,
            rainfall: None,
            last_hour: None,
            coverage_minutes: 0,
            distance_km: None,
        }
    }

    #[test]
    fn outcome_into_inner() {
        assert_eq!(FeedOutcome::Live(vec![1]).into_inner(), vec![1]);
        assert_eq!(FeedOutcome::Fallback(vec![2]).into_inner(), vec![2]);
        assert_eq!(FeedOutcome::<Vec<i32>>::Empty.into_inner(), Vec::<i32>::new());
    }

    #[test]
    fn outcome_source() {
        assert_eq!(FeedOutcome::Live(()).source(), DataSource::Live);
        assert_eq!(FeedOutcome::Fallback(()).source(), DataSource::Snapshot);
        assert_eq!(FeedOutcome::<()>::Empty.source(), DataSource::None);
        assert!(!FeedOutcome::<()>::Empty.is_live());
    }

    #[test]
    fn distances_sort_nearest_first() {
        let user = LatLng::new(1.3521, 103.8198);
        let stations = vec![
            station("far", Some(LatLng::new(1.45, 103.8198))),
            station("unknown", None),
            station("near", Some(LatLng::new(1.36, 103.8198))),
        ];
        let sorted = with_distances(stations, Some(user));
        let ids: Vec<_> = sorted.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far", "unknown"]);
        assert!(sorted[0].distance_km.unwrap() < 1.0);
        assert!(sorted[2].distance_km.is_none());
    }

    #[test]
    fn no_user_keeps_order() {
        let stations = vec![
            station("b", Some(LatLng::new(1.45, 103.8))),
            station("a", Some(LatLng::new(1.36, 103.8))),
        ];
        let kept = with_distances(stations.clone(), None);
        assert_eq!(kept, stations);
    }

    #[test]
    fn service_flood_options_use_config() {
        let mut config = EnvConfig::default();
        config.flood.high_now_mm = 25.0;
        let service = EnvService::with_config(config).unwrap();
        assert_eq!(service.flood_options().thresholds.high_now_mm, 25.0);
    }

    #[test]
    fn broken_snapshot_degrades_to_empty() {
        let service = EnvService::new()
            .unwrap()
            .with_snapshot_source(SnapshotSource::Json("not json".to_string()));
        let info = service.snapshot_debug_info();
        assert_eq!(info.rain_stations, 0);
        assert_eq!(info.source, "inline");
    }
}
