use serde::{Deserialize, Serialize};

use super::{parse_timestamp, GeoPoint};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TwoHourForecastResponse {
    #[serde(default)]
    pub data: Option<TwoHourForecastData>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TwoHourForecastData {
    #[serde(default)]
    pub area_metadata: Vec<AreaMetadata>,
    #[serde(default)]
    pub items: Vec<ForecastItem>,
}

impl TwoHourForecastData {
    pub fn latest_item(&self) -> Option<&ForecastItem> {
        self.items
            .iter()
            .max_by_key(|item| parse_timestamp(&item.timestamp))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AreaMetadata {
    pub name: String,
    #[serde(default)]
    pub label_location: Option<GeoPoint>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ForecastItem {
    #[serde(default)]
    pub update_timestamp: Option<String>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub valid_period: Option<ValidPeriod>,
    #[serde(default)]
    pub forecasts: Vec<AreaForecast>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ValidPeriod {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AreaForecast {
    pub area: String,
    pub forecast: ForecastText,
}

/// Forecast text is a bare string on most deployments and a
/// `{code, text}` object on newer ones.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ForecastText {
    Plain(String),
    Coded {
        #[serde(default)]
        code: Option<String>,
        text: String,
    },
}

impl ForecastText {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::Coded { text, .. } => text,
        }
    }
}
