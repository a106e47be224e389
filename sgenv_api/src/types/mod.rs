use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod readings;
pub use self::readings::{ReadingSet, Station, StationReadingsData, StationReadingsResponse, StationValue};

mod pm25;
pub use self::pm25::{Pm25Data, Pm25Item, Pm25Readings, Pm25Response, RegionMetadata};

mod forecast;
pub use self::forecast::{
    AreaForecast, AreaMetadata, ForecastItem, ForecastText, TwoHourForecastData,
    TwoHourForecastResponse, ValidPeriod,
};

/// WGS84 coordinate pair as the upstream spells it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Parses an upstream RFC 3339 timestamp (usually `+08:00`) into UTC.
///
/// Returns `None` for empty or malformed strings rather than failing the
/// whole payload.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
