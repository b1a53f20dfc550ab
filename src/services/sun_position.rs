/// ============================================================
///  Solar geometry
///
///  Sun elevation and azimuth for a location and UTC instant, used
///  when a readings source does not report sun position itself.
///
///   1. Declination      – Spencer (1971) Fourier series
///   2. Equation of time – Spencer (1971), minutes
///   3. True solar time  – UTC + longitude / 15 + EoT
///   4. Hour angle → elevation / azimuth (north = 0°, clockwise)
///
///  Accuracy is within a fraction of a degree, plenty for a
///  luminance model that works in whole-degree bands.
/// ============================================================

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::f64::consts::PI;

const DEG: f64 = PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
}

/// * `lat_deg` – geographic latitude  (−90 … +90)
/// * `lon_deg` – geographic longitude (−180 … +180, east positive)
pub fn position(lat_deg: f64, lon_deg: f64, utc: DateTime<Utc>) -> SunPosition {
    // ── 1. Time decomposition ──────────────────────────────────
    let doy = utc.ordinal() as f64;
    let ut_h = utc.hour() as f64 + utc.minute() as f64 / 60.0 + utc.second() as f64 / 3600.0;
    let b = 2.0 * PI * (doy - 1.0) / 365.0;

    // ── 2. Declination and equation of time ────────────────────
    let decl = 0.006918 - 0.399912 * b.cos() + 0.070257 * b.sin()
        - 0.006758 * (2.0 * b).cos()
        + 0.000907 * (2.0 * b).sin()
        - 0.002697 * (3.0 * b).cos()
        + 0.00148 * (3.0 * b).sin();

    let eot_min = 229.18
        * (0.000075 + 0.001868 * b.cos()
            - 0.032077 * b.sin()
            - 0.014615 * (2.0 * b).cos()
            - 0.04089 * (2.0 * b).sin());

    // ── 3. True solar time and hour angle ──────────────────────
    let solar_h = (ut_h + lon_deg / 15.0 + eot_min / 60.0).rem_euclid(24.0);
    let omega_deg = 15.0 * (solar_h - 12.0); // negative before solar noon
    let omega = omega_deg * DEG;

    // ── 4. Elevation and azimuth ───────────────────────────────
    let lat = lat_deg * DEG;
    let sin_alpha = (lat.sin() * decl.sin() + lat.cos() * decl.cos() * omega.cos()).clamp(-1.0, 1.0);
    let alpha = sin_alpha.asin();

    let denom = alpha.cos() * lat.cos();
    let cos_az = if denom.abs() > 1e-9 {
        (decl.sin() - sin_alpha * lat.sin()) / denom
    } else {
        0.0
    };
    let az_abs = cos_az.clamp(-1.0, 1.0).acos() / DEG;
    let azimuth_deg = if omega_deg > 0.0 { 360.0 - az_abs } else { az_abs };

    SunPosition {
        elevation_deg: alpha / DEG,
        azimuth_deg: azimuth_deg.rem_euclid(360.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::window_exposure::circular_distance;
    use chrono::TimeZone;

    #[test]
    fn test_summer_noon_italy() {
        // Turin, solar noon falls around 11:30 UTC
        let t = Utc.with_ymd_and_hms(2025, 6, 21, 11, 30, 0).unwrap();
        let p = position(45.07, 7.33, t);
        assert!(p.elevation_deg > 60.0, "Elevation should be >60° at summer noon, got {:.1}", p.elevation_deg);
        assert!(circular_distance(p.azimuth_deg, 180.0) < 15.0, "Sun should be due south, got {:.1}", p.azimuth_deg);
    }

    #[test]
    fn test_winter_solstice() {
        let t = Utc.with_ymd_and_hms(2025, 12, 21, 11, 30, 0).unwrap();
        let p = position(45.07, 7.33, t);
        assert!(p.elevation_deg > 15.0 && p.elevation_deg < 35.0,
            "Winter elevation should be 15-35°, got {:.1}", p.elevation_deg);
    }

    #[test]
    fn test_midnight_below_horizon() {
        let t = Utc.with_ymd_and_hms(2025, 6, 21, 23, 0, 0).unwrap();
        assert!(position(45.07, 7.33, t).elevation_deg < 0.0);
    }

    #[test]
    fn test_morning_and_afternoon_sides() {
        let morning = position(45.07, 7.33, Utc.with_ymd_and_hms(2025, 9, 22, 7, 0, 0).unwrap());
        let afternoon = position(45.07, 7.33, Utc.with_ymd_and_hms(2025, 9, 22, 16, 0, 0).unwrap());
        assert!(morning.azimuth_deg > 60.0 && morning.azimuth_deg < 180.0, "got {:.1}", morning.azimuth_deg);
        assert!(afternoon.azimuth_deg > 180.0 && afternoon.azimuth_deg < 300.0, "got {:.1}", afternoon.azimuth_deg);
    }

    #[test]
    fn test_southern_hemisphere_noon_faces_north() {
        // Sydney, local solar noon around 02:00 UTC
        let t = Utc.with_ymd_and_hms(2025, 6, 21, 2, 0, 0).unwrap();
        let p = position(-33.87, 151.21, t);
        assert!(p.elevation_deg > 25.0 && p.elevation_deg < 40.0, "got {:.1}", p.elevation_deg);
        assert!(circular_distance(p.azimuth_deg, 0.0) < 15.0, "got {:.1}", p.azimuth_deg);
    }
}
