use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ConfigError;
use crate::models::illuminance::Mode;
use crate::models::weather::SensorReadings;
use crate::services::forecast::ForecastSettings;
use crate::services::trend::TrendSettings;
use crate::services::window_exposure::{Window, parse_windows};

fn default_scan_seconds() -> u32 { 120 }
fn default_smooth_seconds() -> f64 { 180.0 }
fn default_on_threshold() -> f64 { 1000.0 }
fn default_off_threshold() -> f64 { 3000.0 }
fn default_max_cloud_div() -> f64 { 10.0 }
fn default_dark_sensitivity() -> f64 { 100.0 }
fn default_trend_window_5m() -> u32 { 5 }
fn default_trend_window_15m() -> u32 { 15 }
fn default_darkening_threshold() -> f64 { -200.0 }
fn default_brightening_threshold() -> f64 { 200.0 }
fn default_true() -> bool { true }
fn default_dark_soon_margin() -> f64 { 200.0 }
fn default_language() -> String { "en".to_string() }
fn default_mqtt_port() -> u16 { 1883 }
fn default_topic_prefix() -> String { "illuminance_plus".to_string() }

/// Divisor used when neither a cloud percentage nor a known condition exists.
pub const FALLBACK_CLOUD_DIVISOR: f64 = 10.0;

// ─── Daemon configuration ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    pub points: Vec<PointConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub broker_host: String,
    #[serde(default = "default_mqtt_port")]
    pub broker_port: u16,
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    pub publish_interval_s: Option<u64>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker_host: String::new(),
            broker_port: default_mqtt_port(),
            client_id: String::new(),
            topic_prefix: default_topic_prefix(),
            publish_interval_s: None,
            username: None,
            password: None,
        }
    }
}

/// One monitored location with its own engine state.
#[derive(Debug, Deserialize, Clone)]
pub struct PointConfig {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_language")]
    pub language: String,
    pub source: SourceConfig,
    #[serde(default)]
    pub options: EngineConfig,
}

/// Where the per-cycle input snapshot comes from.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Open-Meteo current conditions plus hourly forecast rows
    OpenMeteo,
    /// JSON readings document re-read every cycle
    File { path: String },
    /// Fixed readings embedded in the configuration
    Static { readings: SensorReadings },
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

// ─── Engine options ──────────────────────────────────────────────────────────

/// Option keys as entered by the user. Converted into [`EngineConfig`],
/// which is the only form the engine accepts.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, ToSchema)]
pub struct EngineOptions {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_scan_seconds")]
    pub scan_seconds: u32,
    #[serde(default = "default_smooth_seconds")]
    pub smooth_seconds: f64,
    #[serde(default = "default_on_threshold")]
    pub on_threshold: f64,
    #[serde(default = "default_off_threshold")]
    pub off_threshold: f64,
    #[serde(default = "default_max_cloud_div")]
    pub max_cloud_div: f64,
    #[serde(default = "default_dark_sensitivity")]
    pub dark_sensitivity: f64,

    #[serde(default)]
    pub trend_enabled: bool,
    #[serde(default = "default_trend_window_5m")]
    pub trend_window_5m: u32,
    #[serde(default = "default_trend_window_15m")]
    pub trend_window_15m: u32,
    #[serde(default = "default_darkening_threshold")]
    pub darkening_fast_threshold: f64,
    #[serde(default = "default_brightening_threshold")]
    pub brightening_fast_threshold: f64,

    #[serde(default)]
    pub forecast_enabled: bool,
    #[serde(default = "default_true")]
    pub forecast_15m: bool,
    #[serde(default = "default_true")]
    pub forecast_30m: bool,
    #[serde(default)]
    pub forecast_60m: bool,
    #[serde(default = "default_dark_soon_margin")]
    pub dark_soon_margin: f64,

    #[serde(default)]
    pub twilight_enabled: bool,
    #[serde(default)]
    pub helpers_enabled: bool,

    #[serde(default)]
    pub windows_enabled: bool,
    /// YAML list of `{name, azimuth, fov, elev_min}`
    #[serde(default)]
    pub windows_yaml: String,
    #[serde(default = "default_true")]
    pub glare_enabled: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            scan_seconds: default_scan_seconds(),
            smooth_seconds: default_smooth_seconds(),
            on_threshold: default_on_threshold(),
            off_threshold: default_off_threshold(),
            max_cloud_div: default_max_cloud_div(),
            dark_sensitivity: default_dark_sensitivity(),
            trend_enabled: false,
            trend_window_5m: default_trend_window_5m(),
            trend_window_15m: default_trend_window_15m(),
            darkening_fast_threshold: default_darkening_threshold(),
            brightening_fast_threshold: default_brightening_threshold(),
            forecast_enabled: false,
            forecast_15m: true,
            forecast_30m: true,
            forecast_60m: false,
            dark_soon_margin: default_dark_soon_margin(),
            twilight_enabled: false,
            helpers_enabled: false,
            windows_enabled: false,
            windows_yaml: String::new(),
            glare_enabled: true,
        }
    }
}

/// Validated engine configuration. Immutable for one update cycle.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(try_from = "EngineOptions")]
pub struct EngineConfig {
    pub mode: Mode,
    pub scan_period_seconds: u32,
    /// 0 disables smoothing
    pub smoothing_tau_seconds: f64,
    pub on_threshold_lx: f64,
    pub off_threshold_lx: f64,
    pub max_cloud_divisor: f64,
    /// Clamped to 5..=300 when applied
    pub dark_sensitivity_pct: f64,
    pub trend_enabled: bool,
    pub trend: TrendSettings,
    pub forecast_enabled: bool,
    pub forecast: ForecastSettings,
    pub twilight_enabled: bool,
    pub helpers_enabled: bool,
    pub windows_enabled: bool,
    pub glare_enabled: bool,
    pub windows: Vec<Window>,
    /// Options this config was built from, for round-tripping through the API
    pub options: EngineOptions,
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}

impl TryFrom<EngineOptions> for EngineConfig {
    type Error = ConfigError;

    fn try_from(options: EngineOptions) -> Result<Self, Self::Error> {
        check_range("scan_seconds", f64::from(options.scan_seconds), 30.0, 900.0)?;
        check_range("smooth_seconds", options.smooth_seconds, 0.0, 900.0)?;
        check_range("max_cloud_div", options.max_cloud_div, 1.0, 30.0)?;
        check_range("on_threshold", options.on_threshold, 0.0, f64::MAX)?;
        check_range("off_threshold", options.off_threshold, 0.0, f64::MAX)?;
        if options.on_threshold > options.off_threshold {
            return Err(ConfigError::ThresholdOrder {
                on: options.on_threshold,
                off: options.off_threshold,
            });
        }
        Ok(Self::from_checked(options))
    }
}

impl EngineConfig {
    fn from_checked(options: EngineOptions) -> Self {
        let dark_sensitivity_pct = if options.dark_sensitivity.is_finite() {
            options.dark_sensitivity
        } else {
            default_dark_sensitivity()
        };

        let windows = if options.windows_enabled {
            parse_windows(&options.windows_yaml)
        } else {
            Vec::new()
        };

        Self {
            mode: options.mode,
            scan_period_seconds: options.scan_seconds,
            smoothing_tau_seconds: options.smooth_seconds,
            on_threshold_lx: options.on_threshold,
            off_threshold_lx: options.off_threshold,
            max_cloud_divisor: options.max_cloud_div,
            dark_sensitivity_pct,
            trend_enabled: options.trend_enabled,
            trend: TrendSettings {
                short_window_min: options.trend_window_5m,
                long_window_min: options.trend_window_15m,
                darkening_threshold: options.darkening_fast_threshold,
                brightening_threshold: options.brightening_fast_threshold,
            },
            forecast_enabled: options.forecast_enabled,
            forecast: ForecastSettings {
                horizon_15m: options.forecast_15m,
                horizon_30m: options.forecast_30m,
                horizon_60m: options.forecast_60m,
                dark_soon_margin: options.dark_soon_margin,
                max_cloud_divisor: options.max_cloud_div,
                fallback_divisor: FALLBACK_CLOUD_DIVISOR,
            },
            twilight_enabled: options.twilight_enabled,
            helpers_enabled: options.helpers_enabled,
            windows_enabled: options.windows_enabled,
            glare_enabled: options.glare_enabled,
            windows,
            options,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        // Default options satisfy every range and ordering check
        Self::from_checked(EngineOptions::default())
    }
}
