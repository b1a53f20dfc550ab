use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use crate::config::{PointConfig, SourceConfig};
use crate::error::SourceError;
use crate::models::illuminance::{
    ForecastRow, InputSnapshot, Precipitation, PrecipitationUnit, Visibility, VisibilityUnit,
};
use crate::models::weather::{ForecastResponse, HourlyData, SensorReadings};
use crate::services::sun_position;

pub type SnapshotFuture<'a> =
    Pin<Box<dyn Future<Output = Result<InputSnapshot, SourceError>> + Send + 'a>>;

/// Gathers every external signal for one update cycle of a point.
pub trait SnapshotProvider: Send + Sync {
    fn snapshot(&self, now: DateTime<Utc>) -> SnapshotFuture<'_>;

    /// Short name for logs
    fn kind(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub language: String,
}

impl From<&PointConfig> for Location {
    fn from(point: &PointConfig) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            language: point.language.clone(),
        }
    }
}

pub fn provider_for(point: &PointConfig) -> Box<dyn SnapshotProvider> {
    let location = Location::from(point);
    match &point.source {
        SourceConfig::OpenMeteo => Box::new(OpenMeteoProvider::new(location)),
        SourceConfig::File { path } => Box::new(FileProvider {
            path: path.clone(),
            location,
        }),
        SourceConfig::Static { readings } => Box::new(StaticProvider {
            readings: readings.clone(),
            location,
        }),
    }
}

/// Builds a snapshot from readings, filling in sun geometry for the
/// location when the readings carry none.
pub fn snapshot_from_readings(
    readings: &SensorReadings,
    location: &Location,
    now: DateTime<Utc>,
) -> InputSnapshot {
    let computed = sun_position::position(location.latitude, location.longitude, now);
    // Geometry is taken as a pair. A reported elevation without azimuth
    // stays without azimuth.
    let (elevation, azimuth) = match readings.sun_elevation_deg.filter(|e| e.is_finite()) {
        Some(elevation) => (elevation, readings.sun_azimuth_deg),
        None => (computed.elevation_deg, Some(computed.azimuth_deg)),
    };

    InputSnapshot {
        taken_at: now,
        sun_elevation_deg: elevation,
        sun_azimuth_deg: azimuth,
        weather_condition: readings.weather_condition.clone(),
        cloud_cover_pct: readings.cloud_cover,
        precipitation: readings.precipitation,
        visibility: readings.visibility,
        forecast: readings.forecast.clone(),
        latitude: Some(location.latitude),
        language: location.language.clone(),
    }
}

// ─── Open-Meteo ──────────────────────────────────────────────────────────────

pub struct OpenMeteoProvider {
    client: reqwest::Client,
    location: Location,
}

impl OpenMeteoProvider {
    pub fn new(location: Location) -> Self {
        Self {
            client: reqwest::Client::new(),
            location,
        }
    }

    fn url(&self) -> String {
        format!(
            "https://api.open-meteo.com/v1/forecast?latitude={}&longitude={}\
             &current=cloud_cover,precipitation,visibility,weather_code,is_day\
             &hourly=cloud_cover,precipitation,weather_code&forecast_hours=3&timezone=GMT",
            self.location.latitude, self.location.longitude
        )
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<InputSnapshot, SourceError> {
        let response = self
            .client
            .get(self.url())
            .send()
            .await?
            .error_for_status()?
            .json::<ForecastResponse>()
            .await?;
        let readings = readings_from_open_meteo(&response);
        Ok(snapshot_from_readings(&readings, &self.location, now))
    }
}

impl SnapshotProvider for OpenMeteoProvider {
    fn snapshot(&self, now: DateTime<Utc>) -> SnapshotFuture<'_> {
        Box::pin(self.fetch(now))
    }

    fn kind(&self) -> &'static str {
        "open_meteo"
    }
}

/// WMO weather interpretation code → condition slug.
pub fn condition_from_wmo(code: u16, is_day: bool) -> Option<&'static str> {
    let slug = match code {
        0 | 1 if is_day => "sunny",
        0 | 1 => "clear-night",
        2 => "partlycloudy",
        3 => "cloudy",
        45 | 48 => "fog",
        51..=57 | 61 | 63 | 66 | 80 | 81 => "rainy",
        65 | 67 | 82 => "pouring",
        71..=77 | 85 | 86 => "snowy",
        95..=99 => "lightning-rainy",
        _ => return None,
    };
    Some(slug)
}

fn forecast_rows(hourly: &HourlyData) -> Vec<ForecastRow> {
    hourly
        .time
        .iter()
        .enumerate()
        .map(|(i, time)| ForecastRow {
            datetime: Some(time.clone()),
            cloud_coverage: hourly.cloud_cover.get(i).copied().flatten(),
            condition: hourly
                .weather_code
                .get(i)
                .copied()
                .flatten()
                .and_then(|code| condition_from_wmo(code, true))
                .map(str::to_string),
            precipitation: hourly.precipitation.get(i).copied().flatten(),
        })
        .collect()
}

pub fn readings_from_open_meteo(response: &ForecastResponse) -> SensorReadings {
    let current = &response.current;
    let is_day = current.is_day.unwrap_or(1) == 1;
    SensorReadings {
        sun_elevation_deg: None,
        sun_azimuth_deg: None,
        weather_condition: current
            .weather_code
            .and_then(|code| condition_from_wmo(code, is_day))
            .map(str::to_string),
        cloud_cover: current.cloud_cover,
        precipitation: current.precipitation.map(|value| Precipitation {
            value,
            unit: PrecipitationUnit::MillimetersPerHour,
        }),
        visibility: current.visibility.map(|metres| Visibility {
            value: metres / 1000.0,
            unit: VisibilityUnit::Kilometers,
        }),
        forecast: Some(response.hourly.as_ref().map(forecast_rows).unwrap_or_default()),
    }
}

// ─── Local sources ───────────────────────────────────────────────────────────

/// JSON readings document re-read on every cycle.
pub struct FileProvider {
    path: String,
    location: Location,
}

impl FileProvider {
    async fn read(&self, now: DateTime<Utc>) -> Result<InputSnapshot, SourceError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        let readings: SensorReadings = serde_json::from_str(&content)?;
        Ok(snapshot_from_readings(&readings, &self.location, now))
    }
}

impl SnapshotProvider for FileProvider {
    fn snapshot(&self, now: DateTime<Utc>) -> SnapshotFuture<'_> {
        Box::pin(self.read(now))
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}

pub struct StaticProvider {
    readings: SensorReadings,
    location: Location,
}

impl StaticProvider {
    pub fn new(readings: SensorReadings, location: Location) -> Self {
        Self { readings, location }
    }
}

impl SnapshotProvider for StaticProvider {
    fn snapshot(&self, now: DateTime<Utc>) -> SnapshotFuture<'_> {
        let snapshot = snapshot_from_readings(&self.readings, &self.location, now);
        Box::pin(async move { Ok(snapshot) })
    }

    fn kind(&self) -> &'static str {
        "static"
    }
}
