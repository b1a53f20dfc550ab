//! Direct-sun exposure of configured windows and a coarse glare tier.

use serde::Serialize;
use serde_yaml::Value;
use utoipa::ToSchema;

use crate::models::illuminance::{GlareRisk, WindowExposure};

pub const DEFAULT_FIELD_OF_VIEW_DEG: f64 = 30.0;
pub const DEFAULT_MIN_ELEVATION_DEG: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Window {
    pub name: String,
    /// Direction the window faces, degrees from north, clockwise
    pub azimuth_deg: f64,
    /// Half-width of the accepted azimuth cone
    pub field_of_view_deg: f64,
    pub min_elevation_deg: f64,
}

impl Window {
    pub fn is_sunlit(&self, elevation_deg: f64, azimuth_deg: f64) -> bool {
        elevation_deg >= self.min_elevation_deg
            && circular_distance(azimuth_deg, self.azimuth_deg) <= self.field_of_view_deg
    }
}

/// Shortest angular distance between two bearings, in `[0, 180]`.
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    d.min(360.0 - d)
}

fn yaml_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Optional numeric key: missing means `default`, present but not a number
/// rejects the entry.
fn optional_number(entry: &Value, key: &str, default: f64) -> Option<f64> {
    match entry.get(key) {
        None | Some(Value::Null) => Some(default),
        Some(v) => yaml_number(v),
    }
}

fn parse_window(entry: &Value) -> Option<Window> {
    let name = match entry.get("name") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "window".to_string(),
    };
    Some(Window {
        name,
        azimuth_deg: entry.get("azimuth").and_then(yaml_number)?,
        field_of_view_deg: optional_number(entry, "fov", DEFAULT_FIELD_OF_VIEW_DEG)?,
        min_elevation_deg: optional_number(entry, "elev_min", DEFAULT_MIN_ELEVATION_DEG)?,
    })
}

/// Parses the windows YAML list (`name`, `azimuth`, `fov`, `elev_min`).
/// Invalid entries are dropped one by one; an unreadable document yields
/// no windows at all.
pub fn parse_windows(yaml_text: &str) -> Vec<Window> {
    if yaml_text.trim().is_empty() {
        return Vec::new();
    }
    let document: Value = match serde_yaml::from_str(yaml_text) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!("windows_yaml parse failed: {}", e);
            return Vec::new();
        }
    };
    let Value::Sequence(entries) = document else {
        tracing::warn!("windows_yaml is not a list, ignoring it");
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let window = parse_window(entry);
            if window.is_none() {
                tracing::warn!("dropping window entry #{}: missing or non-numeric fields", index);
            }
            window
        })
        .collect()
}

pub fn glare_risk(clear_sky_lux: f64, elevation_deg: f64) -> GlareRisk {
    if clear_sky_lux > 80_000.0 && elevation_deg > 25.0 {
        GlareRisk::High
    } else if clear_sky_lux > 40_000.0 && elevation_deg > 15.0 {
        GlareRisk::Med
    } else {
        GlareRisk::Low
    }
}

pub fn evaluate(
    windows: &[Window],
    elevation_deg: f64,
    azimuth_deg: f64,
    clear_sky_lux: f64,
    glare_enabled: bool,
) -> WindowExposure {
    let sun_on_windows: Vec<String> = windows
        .iter()
        .filter(|w| w.is_sunlit(elevation_deg, azimuth_deg))
        .map(|w| w.name.clone())
        .collect();

    let glare = glare_enabled.then(|| {
        if sun_on_windows.is_empty() {
            GlareRisk::None
        } else {
            glare_risk(clear_sky_lux, elevation_deg)
        }
    });

    WindowExposure {
        sun_on_windows,
        glare_risk: glare,
    }
}
