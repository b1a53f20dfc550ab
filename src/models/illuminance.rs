use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use utoipa::ToSchema;

// ─── Engine inputs ───────────────────────────────────────────────────────────

/// Clear-sky model selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Closed-form clear-sky approximation (~125 klx at zenith)
    #[default]
    Normal,
    /// Plain `1000 · sin(elevation)`
    Simple,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Simple => "simple",
        }
    }
}

/// Unit tag of a precipitation reading. Tags outside the known set keep
/// the value unconverted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(from = "String")]
pub enum PrecipitationUnit {
    #[default]
    #[serde(rename = "mm/h")]
    MillimetersPerHour,
    #[serde(rename = "in/h")]
    InchesPerHour,
    #[serde(rename = "other")]
    Other,
}

impl From<String> for PrecipitationUnit {
    fn from(tag: String) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "mm/h" | "mm" => PrecipitationUnit::MillimetersPerHour,
            "in/h" | "inch/h" | "inches/hour" | "in" => PrecipitationUnit::InchesPerHour,
            _ => PrecipitationUnit::Other,
        }
    }
}

/// Unit tag of a visibility reading. Tags outside the known set keep the
/// value unconverted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(from = "String")]
pub enum VisibilityUnit {
    #[default]
    #[serde(rename = "km")]
    Kilometers,
    #[serde(rename = "mi")]
    Miles,
    #[serde(rename = "other")]
    Other,
}

impl From<String> for VisibilityUnit {
    fn from(tag: String) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "km" => VisibilityUnit::Kilometers,
            "mi" | "mile" | "miles" => VisibilityUnit::Miles,
            _ => VisibilityUnit::Other,
        }
    }
}

/// Precipitation rate as reported by the sensor, with its unit tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Precipitation {
    #[serde(deserialize_with = "numeric_f64")]
    pub value: f64,
    #[serde(default)]
    pub unit: PrecipitationUnit,
}

/// Horizontal visibility as reported by the sensor, with its unit tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Visibility {
    #[serde(deserialize_with = "numeric_f64")]
    pub value: f64,
    #[serde(default)]
    pub unit: VisibilityUnit,
}

/// One row of an external weather forecast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    #[serde(default, alias = "datetime_iso", alias = "time")]
    pub datetime: Option<String>,
    #[serde(default, alias = "cloud_cover", deserialize_with = "lenient_f64")]
    pub cloud_coverage: Option<f64>,
    #[serde(default)]
    pub condition: Option<String>,
    /// mm/h
    #[serde(default, deserialize_with = "lenient_f64")]
    pub precipitation: Option<f64>,
}

/// Read-only view of every external signal one update cycle needs.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSnapshot {
    pub taken_at: DateTime<Utc>,
    pub sun_elevation_deg: f64,
    pub sun_azimuth_deg: Option<f64>,
    pub weather_condition: Option<String>,
    pub cloud_cover_pct: Option<f64>,
    pub precipitation: Option<Precipitation>,
    pub visibility: Option<Visibility>,
    /// `None` when no weather source is configured; `Some(vec![])` when the
    /// source has no rows right now.
    pub forecast: Option<Vec<ForecastRow>>,
    pub latitude: Option<f64>,
    pub language: String,
}

impl InputSnapshot {
    /// Snapshot with only sun geometry set; every weather signal missing.
    pub fn new(taken_at: DateTime<Utc>, sun_elevation_deg: f64, sun_azimuth_deg: Option<f64>) -> Self {
        Self {
            taken_at,
            sun_elevation_deg,
            sun_azimuth_deg,
            weather_condition: None,
            cloud_cover_pct: None,
            precipitation: None,
            visibility: None,
            forecast: None,
            latitude: None,
            language: "en".to_string(),
        }
    }
}

/// Accepts a number, a numeric string or null. Anything else reads as
/// missing instead of failing the whole document.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|v| v.is_finite()))
}

/// Like [`lenient_f64`] but the value is required.
fn numeric_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_f64(deserializer)?.ok_or_else(|| D::Error::custom("expected a finite number"))
}

/// Optional reading that reads as missing when it does not parse, so one
/// unavailable sensor never fails the whole document.
pub fn lenient_reading<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

// ─── Engine outputs ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Daypart {
    Night,
    LateEvening,
    EarlyMorning,
    Morning,
    LateMorning,
    Midday,
    Afternoon,
    LateAfternoon,
    Evening,
}

impl Daypart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Daypart::Night => "night",
            Daypart::LateEvening => "late_evening",
            Daypart::EarlyMorning => "early_morning",
            Daypart::Morning => "morning",
            Daypart::LateMorning => "late_morning",
            Daypart::Midday => "midday",
            Daypart::Afternoon => "afternoon",
            Daypart::LateAfternoon => "late_afternoon",
            Daypart::Evening => "evening",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GlareRisk {
    None,
    Low,
    Med,
    High,
}

impl GlareRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlareRisk::None => "none",
            GlareRisk::Low => "low",
            GlareRisk::Med => "med",
            GlareRisk::High => "high",
        }
    }
}

/// Multiplicative damping factors applied to clear-sky illuminance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct AttenuationFactors {
    pub cloud_divisor: f64,
    pub rain_gain: f64,
    pub visibility_gain: f64,
    pub low_sun_gain: f64,
}

impl AttenuationFactors {
    pub fn product(&self) -> f64 {
        self.cloud_divisor * self.rain_gain * self.visibility_gain * self.low_sun_gain
    }
}

/// Configured and sensitivity-scaled hysteresis thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Thresholds {
    pub on_lx: f64,
    pub off_lx: f64,
    /// As configured; the effective thresholds use it clamped to 5..=300
    pub sensitivity_pct: f64,
    pub on_eff_lx: f64,
    pub off_eff_lx: f64,
}

/// Signals after unit normalization and defaulting.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NormalizedInputs {
    pub weather_condition: Option<String>,
    pub cloud_cover_pct: Option<f64>,
    pub precipitation_mm_h: f64,
    pub visibility_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct TrendInfo {
    /// lx/min over the short window (default 5 min)
    pub short_lx_per_min: Option<f64>,
    /// lx/min over the long window (default 15 min)
    pub long_lx_per_min: Option<f64>,
    pub darkening_fast: Option<bool>,
    pub brightening_fast: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ForecastInfo {
    pub lux_15m: Option<f64>,
    pub lux_30m: Option<f64>,
    pub lux_60m: Option<f64>,
    pub dark_soon: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct TwilightFlags {
    pub civil: bool,
    pub nautical: bool,
    pub astronomical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WindowExposure {
    /// Names of windows currently hit by direct sun
    pub sun_on_windows: Vec<String>,
    /// `None` when glare estimation is disabled
    pub glare_risk: Option<GlareRisk>,
}

/// Immutable output of one engine cycle.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UpdateResult {
    pub computed_at: DateTime<Utc>,
    pub mode: Mode,
    pub raw_lux: f64,
    pub control_lux: f64,
    pub clear_sky_lux: f64,
    pub is_dark: bool,
    pub thresholds: Thresholds,
    pub daypart: Daypart,
    pub daypart_label: String,
    pub elevation_deg: f64,
    pub azimuth_deg: Option<f64>,
    pub attenuation: AttenuationFactors,
    pub inputs: NormalizedInputs,
    pub smoothing_tau_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twilight: Option<TwilightFlags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows: Option<WindowExposure>,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

impl UpdateResult {
    /// State value shown to the user: raw lux, whole lux.
    pub fn native_value(&self) -> f64 {
        round_to(self.raw_lux, 0)
    }

    /// Flat key/value attribute set. Optional groups are omitted entirely
    /// when their feature is disabled.
    pub fn attributes(&self) -> Map<String, Value> {
        let t = &self.thresholds;
        let a = &self.attenuation;
        let mut map = match json!({
            "daypart": self.daypart.as_str(),
            "daypart_label": self.daypart_label,
            "is_dark": self.is_dark,
            "on_threshold": t.on_lx,
            "off_threshold": t.off_lx,
            "dark_sensitivity_pct": t.sensitivity_pct.round() as i64,
            "on_threshold_eff": round_to(t.on_eff_lx, 0),
            "off_threshold_eff": round_to(t.off_eff_lx, 0),
            "elevation": round_to(self.elevation_deg, 2),
            "azimuth": self.azimuth_deg.map(|az| round_to(az, 1)),
            "clear_sky_lux": round_to(self.clear_sky_lux, 0),
            "cloud_divisor": round_to(a.cloud_divisor, 2),
            "rain_gain": a.rain_gain,
            "visibility_gain": a.visibility_gain,
            "low_sun_gain": a.low_sun_gain,
            "weather_state": self.inputs.weather_condition,
            "cloud_input": self.inputs.cloud_cover_pct,
            "precip_mm_h": self.inputs.precipitation_mm_h,
            "visibility_km": self.inputs.visibility_km,
            "mode": self.mode.as_str(),
            "raw_lux": round_to(self.raw_lux, 0),
            "control_lux": round_to(self.control_lux, 0),
            "smooth_seconds": self.smoothing_tau_seconds,
        }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        if let Some(trend) = &self.trend {
            map.insert("lux_trend_5m".into(), json!(trend.short_lx_per_min.map(|v| round_to(v, 1))));
            map.insert("lux_trend_15m".into(), json!(trend.long_lx_per_min.map(|v| round_to(v, 1))));
            map.insert("darkening_fast".into(), json!(trend.darkening_fast));
            map.insert("brightening_fast".into(), json!(trend.brightening_fast));
        }
        if let Some(forecast) = &self.forecast {
            map.insert("lux_forecast_15m".into(), json!(forecast.lux_15m.map(|v| round_to(v, 0))));
            map.insert("lux_forecast_30m".into(), json!(forecast.lux_30m.map(|v| round_to(v, 0))));
            map.insert("lux_forecast_60m".into(), json!(forecast.lux_60m.map(|v| round_to(v, 0))));
            map.insert("dark_soon".into(), json!(forecast.dark_soon));
        }
        if let Some(twilight) = &self.twilight {
            map.insert("is_civil_twilight".into(), json!(twilight.civil));
            map.insert("is_nautical_twilight".into(), json!(twilight.nautical));
            map.insert("is_astronomical_twilight".into(), json!(twilight.astronomical));
        }
        if let Some(windows) = &self.windows {
            map.insert("sun_on_window".into(), json!(windows.sun_on_windows));
            map.insert("glare_risk".into(), json!(windows.glare_risk.map(|g| g.as_str())));
        }
        map
    }
}

// ─── Helper projections ──────────────────────────────────────────────────────

/// Boolean fields that can be mirrored as standalone on/off helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperFlag {
    Dark,
    DarkSoon,
}

/// Projects one boolean out of a result. `None` when the field is not part
/// of this result (e.g. forecasting disabled).
pub fn helper_state(result: &UpdateResult, flag: HelperFlag) -> Option<bool> {
    match flag {
        HelperFlag::Dark => Some(result.is_dark),
        HelperFlag::DarkSoon => result.forecast.map(|f| f.dark_soon),
    }
}

// ─── REST API response types ─────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct PointSummary {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub language: String,
    pub scan_seconds: u32,
    pub has_result: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PointStatusResponse {
    pub timestamp: DateTime<Utc>,
    pub point_id: String,
    /// Rounded raw lux
    pub native_value: f64,
    pub data: UpdateResult,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HelperStates {
    pub dark: Option<bool>,
    pub dark_soon: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshAllResponse {
    pub refreshed: Vec<String>,
    pub failed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_row_accepts_numeric_strings_and_aliases() {
        let row: ForecastRow = serde_json::from_str(
            r#"{"datetime_iso": "2025-06-01T12:00:00Z", "cloud_cover": "75", "precipitation": "n/a"}"#,
        )
        .unwrap();
        assert_eq!(row.datetime.as_deref(), Some("2025-06-01T12:00:00Z"));
        assert_eq!(row.cloud_coverage, Some(75.0));
        assert_eq!(row.precipitation, None);
    }

    #[test]
    fn unit_tags_parse_from_sensor_strings() {
        let p: Precipitation = serde_json::from_str(r#"{"value": 0.1, "unit": "inches/hour"}"#).unwrap();
        assert_eq!(p.unit, PrecipitationUnit::InchesPerHour);
        let v: Visibility = serde_json::from_str(r#"{"value": 3.0, "unit": "miles"}"#).unwrap();
        assert_eq!(v.unit, VisibilityUnit::Miles);
        let v: Visibility = serde_json::from_str(r#"{"value": 3.0}"#).unwrap();
        assert_eq!(v.unit, VisibilityUnit::Kilometers);
        let v: Visibility = serde_json::from_str(r#"{"value": "9.5", "unit": "Mi"}"#).unwrap();
        assert_eq!((v.value, v.unit), (9.5, VisibilityUnit::Miles));
        let v: Visibility = serde_json::from_str(r#"{"value": 8000, "unit": "m"}"#).unwrap();
        assert_eq!(v.unit, VisibilityUnit::Other);
        assert!(serde_json::from_str::<Precipitation>(r#"{"value": "unavailable"}"#).is_err());
    }
}
