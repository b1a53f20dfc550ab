use serde::Deserialize;

use crate::models::illuminance::{ForecastRow, Precipitation, Visibility, lenient_f64, lenient_reading};

// ─── Local readings documents ────────────────────────────────────────────────

/// Sensor readings supplied by a file or embedded in the configuration.
/// Sun geometry is optional; when absent it is computed for the point.
/// A reading that does not parse counts as missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensorReadings {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sun_elevation_deg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sun_azimuth_deg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_reading")]
    pub weather_condition: Option<String>,
    /// Percent, number or numeric string
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cloud_cover: Option<f64>,
    #[serde(default, deserialize_with = "lenient_reading")]
    pub precipitation: Option<Precipitation>,
    #[serde(default, deserialize_with = "lenient_reading")]
    pub visibility: Option<Visibility>,
    /// Present only when a weather forecast source exists
    pub forecast: Option<Vec<ForecastRow>>,
}

// ─── Open-Meteo wire types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub current: CurrentData,
    #[serde(default)]
    pub hourly: Option<HourlyData>,
}

#[derive(Debug, Deserialize)]
pub struct CurrentData {
    pub time: String,
    /// %
    pub cloud_cover: Option<f64>,
    /// mm (preceding hour)
    pub precipitation: Option<f64>,
    /// m
    pub visibility: Option<f64>,
    pub weather_code: Option<u16>,
    pub is_day: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct HourlyData {
    pub time: Vec<String>,
    #[serde(default)]
    pub cloud_cover: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation: Vec<Option<f64>>,
    #[serde(default)]
    pub weather_code: Vec<Option<u16>>,
}
