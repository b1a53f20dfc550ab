//! Atmospheric damping of clear-sky illuminance.
//!
//! Four independent factors are multiplied together and divide the
//! clear-sky value: cloud cover (or the weather condition when no cloud
//! percentage is known), precipitation, visibility and low sun angle.
//! All functions are total; missing signals fall back to fixed defaults.

use crate::models::illuminance::{
    AttenuationFactors, Precipitation, PrecipitationUnit, Visibility, VisibilityUnit,
};

/// Visibility assumed when no sensor reading exists.
pub const UNKNOWN_VISIBILITY_KM: f64 = 99.0;

const KM_PER_MILE: f64 = 1.60934;
const MM_PER_INCH: f64 = 25.4;

/// Divisor for a weather condition slug when no cloud percentage exists.
pub fn condition_divisor(condition: &str) -> Option<f64> {
    match condition {
        "exceptional" | "sunny" | "clear" => Some(1.0),
        "partlycloudy" => Some(2.0),
        "cloudy" | "rainy" => Some(5.0),
        "pouring" | "lightning" | "lightning-rainy" | "fog" => Some(10.0),
        _ => None,
    }
}

/// `10^(c/100)` capped at `max_divisor` for a numeric cloud cover; the
/// condition table otherwise; `fallback` when neither is known.
pub fn cloud_divisor(
    cloud_pct: Option<f64>,
    condition: Option<&str>,
    max_divisor: f64,
    fallback: f64,
) -> f64 {
    if let Some(cloud) = cloud_pct.filter(|c| c.is_finite()) {
        let divisor = 10f64.powf(cloud.clamp(0.0, 100.0) / 100.0);
        return divisor.min(max_divisor);
    }
    match condition {
        Some(state) if !state.is_empty() => condition_divisor(state).unwrap_or(fallback),
        _ => fallback,
    }
}

pub fn rain_gain(mm_per_hour: Option<f64>) -> f64 {
    let rate = mm_per_hour.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0);
    if rate >= 2.0 {
        2.2
    } else if rate >= 0.5 {
        1.7
    } else if rate > 0.0 {
        1.3
    } else {
        1.0
    }
}

pub fn visibility_gain(km: Option<f64>, condition: Option<&str>) -> f64 {
    if condition == Some("fog") {
        return 1.4;
    }
    let km = km.filter(|v| v.is_finite()).unwrap_or(UNKNOWN_VISIBILITY_KM).max(0.0);
    if km < 2.0 {
        1.4
    } else if km < 5.0 {
        1.2
    } else {
        1.0
    }
}

pub fn low_sun_gain(elevation_deg: f64) -> f64 {
    if elevation_deg < 5.0 {
        1.4
    } else if elevation_deg < 10.0 {
        1.2
    } else {
        1.0
    }
}

/// Clear-sky lux after damping; never below zero and never brightened.
pub fn attenuated_lux(clear_sky_lux: f64, factors: &AttenuationFactors) -> f64 {
    if clear_sky_lux <= 0.0 {
        return 0.0;
    }
    clear_sky_lux / factors.product().max(1.0)
}

// ─── Unit normalization ──────────────────────────────────────

pub fn precipitation_mm_per_hour(reading: Option<Precipitation>) -> Option<f64> {
    let reading = reading.filter(|r| r.value.is_finite())?;
    let mm = match reading.unit {
        PrecipitationUnit::MillimetersPerHour | PrecipitationUnit::Other => reading.value,
        PrecipitationUnit::InchesPerHour => reading.value * MM_PER_INCH,
    };
    Some(mm.max(0.0))
}

pub fn visibility_km(reading: Option<Visibility>) -> Option<f64> {
    let reading = reading.filter(|r| r.value.is_finite())?;
    let km = match reading.unit {
        VisibilityUnit::Kilometers | VisibilityUnit::Other => reading.value,
        VisibilityUnit::Miles => reading.value * KM_PER_MILE,
    };
    Some(km.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_divisor_endpoints() {
        assert_eq!(cloud_divisor(Some(0.0), None, 10.0, 10.0), 1.0);
        assert!((cloud_divisor(Some(100.0), None, 30.0, 10.0) - 10.0).abs() < 1e-9);
        // Capped by the configured maximum
        assert_eq!(cloud_divisor(Some(100.0), None, 4.0, 10.0), 4.0);
        // Out-of-range percentages are clamped
        assert_eq!(cloud_divisor(Some(-20.0), None, 10.0, 10.0), 1.0);
        assert!((cloud_divisor(Some(250.0), None, 30.0, 10.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_cloud_divisor_monotonic() {
        let mut previous = 0.0;
        for c in 0..=100 {
            let d = cloud_divisor(Some(c as f64), None, 10.0, 10.0);
            assert!(d >= previous, "divisor decreased at {c}%");
            previous = d;
        }
    }

    #[test]
    fn test_cloud_divisor_condition_fallbacks() {
        assert_eq!(cloud_divisor(None, Some("sunny"), 10.0, 10.0), 1.0);
        assert_eq!(cloud_divisor(None, Some("partlycloudy"), 10.0, 10.0), 2.0);
        assert_eq!(cloud_divisor(None, Some("rainy"), 10.0, 10.0), 5.0);
        assert_eq!(cloud_divisor(None, Some("lightning-rainy"), 10.0, 10.0), 10.0);
        assert_eq!(cloud_divisor(None, Some("snowy"), 10.0, 7.0), 7.0);
        assert_eq!(cloud_divisor(None, None, 10.0, 7.0), 7.0);
        // Numeric cloud wins over the condition
        assert_eq!(cloud_divisor(Some(0.0), Some("pouring"), 10.0, 10.0), 1.0);
    }

    #[test]
    fn test_gain_steps() {
        assert_eq!(rain_gain(None), 1.0);
        assert_eq!(rain_gain(Some(-1.0)), 1.0);
        assert_eq!(rain_gain(Some(0.0)), 1.0);
        assert_eq!(rain_gain(Some(0.2)), 1.3);
        assert_eq!(rain_gain(Some(0.5)), 1.7);
        assert_eq!(rain_gain(Some(2.0)), 2.2);

        assert_eq!(visibility_gain(None, None), 1.0);
        assert_eq!(visibility_gain(Some(20.0), Some("fog")), 1.4);
        assert_eq!(visibility_gain(Some(1.0), None), 1.4);
        assert_eq!(visibility_gain(Some(3.0), None), 1.2);
        assert_eq!(visibility_gain(Some(5.0), None), 1.0);

        assert_eq!(low_sun_gain(2.0), 1.4);
        assert_eq!(low_sun_gain(5.0), 1.2);
        assert_eq!(low_sun_gain(10.0), 1.0);
    }

    #[test]
    fn test_attenuated_lux() {
        let factors = AttenuationFactors {
            cloud_divisor: 2.0,
            rain_gain: 1.3,
            visibility_gain: 1.0,
            low_sun_gain: 1.0,
        };
        assert!((attenuated_lux(26_000.0, &factors) - 10_000.0).abs() < 1e-6);
        assert_eq!(attenuated_lux(0.0, &factors), 0.0);

        // A product below one never brightens the sky
        let neutral = AttenuationFactors {
            cloud_divisor: 0.5,
            rain_gain: 1.0,
            visibility_gain: 1.0,
            low_sun_gain: 1.0,
        };
        assert_eq!(attenuated_lux(500.0, &neutral), 500.0);
    }

    #[test]
    fn test_unit_normalization() {
        let miles = Visibility { value: 2.0, unit: VisibilityUnit::Miles };
        assert!((visibility_km(Some(miles)).unwrap() - 3.21868).abs() < 1e-9);

        let inches = Precipitation { value: 0.1, unit: PrecipitationUnit::InchesPerHour };
        assert!((precipitation_mm_per_hour(Some(inches)).unwrap() - 2.54).abs() < 1e-9);

        let negative = Precipitation { value: -3.0, unit: PrecipitationUnit::MillimetersPerHour };
        assert_eq!(precipitation_mm_per_hour(Some(negative)), Some(0.0));
        assert_eq!(visibility_km(None), None);

        // Unknown tags pass the value through unconverted
        let metres = Visibility { value: 8000.0, unit: VisibilityUnit::Other };
        assert_eq!(visibility_km(Some(metres)), Some(8000.0));
        assert_eq!(visibility_gain(visibility_km(Some(metres)), None), 1.0);
        let other = Precipitation { value: 0.7, unit: PrecipitationUnit::Other };
        assert_eq!(precipitation_mm_per_hour(Some(other)), Some(0.7));
    }
}
