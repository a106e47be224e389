use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{parse_timestamp, GeoPoint};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Pm25Response {
    #[serde(default)]
    pub data: Option<Pm25Data>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Pm25Data {
    #[serde(default)]
    pub region_metadata: Vec<RegionMetadata>,
    #[serde(default)]
    pub items: Vec<Pm25Item>,
}

impl Pm25Data {
    pub fn latest_item(&self) -> Option<&Pm25Item> {
        self.items
            .iter()
            .max_by_key(|item| parse_timestamp(&item.timestamp))
    }
}

/// A named region (north/south/east/west/central) with a label position.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegionMetadata {
    pub name: String,
    #[serde(default)]
    pub label_location: Option<GeoPoint>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Pm25Item {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub updated_timestamp: Option<String>,
    #[serde(default)]
    pub readings: Pm25Readings,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Pm25Readings {
    /// Region name to one-hour PM2.5 concentration (µg/m³).
    #[serde(default)]
    pub pm25_one_hourly: HashMap<String, f64>,
}
