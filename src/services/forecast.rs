/// ============================================================
///  Short-horizon illuminance forecast
///
///  For every enabled horizon the forecast row closest in time to
///  `now + horizon` is selected and the cloud/rain part of the
///  attenuation model is re-evaluated with its values.
///
///  Sun geometry is held at its current value: clear-sky lux,
///  visibility gain and low-sun gain are reused unchanged. This is
///  an approximation that only holds for horizons up to about an
///  hour, since no projected sun position is available.
/// ============================================================

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::models::illuminance::{AttenuationFactors, ForecastInfo, ForecastRow};
use crate::services::attenuation::{attenuated_lux, cloud_divisor, rain_gain};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastSettings {
    pub horizon_15m: bool,
    pub horizon_30m: bool,
    pub horizon_60m: bool,
    /// lx added to the effective on threshold for `dark_soon`
    pub dark_soon_margin: f64,
    pub max_cloud_divisor: f64,
    pub fallback_divisor: f64,
}

/// Current-sky values that stay fixed across all horizons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentSky {
    pub clear_sky_lux: f64,
    pub visibility_gain: f64,
    pub low_sun_gain: f64,
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` timestamp read as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Row whose timestamp is nearest to `target`. Rows without a readable
/// timestamp never match; ties keep the earlier row in the list.
pub fn nearest_row(rows: &[ForecastRow], target: DateTime<Utc>) -> Option<&ForecastRow> {
    rows.iter()
        .filter_map(|row| {
            let at = parse_timestamp(row.datetime.as_deref()?)?;
            Some(((at - target).num_milliseconds().abs(), row))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, row)| row)
}

pub fn project_lux(row: &ForecastRow, sky: &CurrentSky, settings: &ForecastSettings) -> f64 {
    let factors = AttenuationFactors {
        cloud_divisor: cloud_divisor(
            row.cloud_coverage,
            row.condition.as_deref(),
            settings.max_cloud_divisor,
            settings.fallback_divisor,
        ),
        rain_gain: rain_gain(row.precipitation),
        visibility_gain: sky.visibility_gain,
        low_sun_gain: sky.low_sun_gain,
    };
    attenuated_lux(sky.clear_sky_lux, &factors)
}

/// Projection for one horizon in whole lux; `dark_soon` compares these.
fn horizon(rows: &[ForecastRow], now: DateTime<Utc>, minutes: i64, sky: &CurrentSky, settings: &ForecastSettings) -> Option<f64> {
    nearest_row(rows, now + Duration::minutes(minutes)).map(|row| project_lux(row, sky, settings).round())
}

pub fn predict(
    rows: &[ForecastRow],
    now: DateTime<Utc>,
    sky: &CurrentSky,
    on_threshold_eff: f64,
    settings: &ForecastSettings,
) -> ForecastInfo {
    let lux_15m = settings.horizon_15m.then(|| horizon(rows, now, 15, sky, settings)).flatten();
    let lux_30m = settings.horizon_30m.then(|| horizon(rows, now, 30, sky, settings)).flatten();
    let lux_60m = settings.horizon_60m.then(|| horizon(rows, now, 60, sky, settings)).flatten();

    let limit = on_threshold_eff + settings.dark_soon_margin;
    let dark_soon = [lux_15m, lux_30m, lux_60m]
        .into_iter()
        .flatten()
        .any(|lux| lux <= limit);

    ForecastInfo {
        lux_15m,
        lux_30m,
        lux_60m,
        dark_soon,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 3, 15, 0, 0).unwrap()
    }

    fn row(offset_min: i64, cloud: Option<f64>, condition: Option<&str>, rain: Option<f64>) -> ForecastRow {
        ForecastRow {
            datetime: Some((now() + Duration::minutes(offset_min)).to_rfc3339()),
            cloud_coverage: cloud,
            condition: condition.map(str::to_string),
            precipitation: rain,
        }
    }

    fn settings() -> ForecastSettings {
        ForecastSettings {
            horizon_15m: true,
            horizon_30m: true,
            horizon_60m: true,
            dark_soon_margin: 200.0,
            max_cloud_divisor: 10.0,
            fallback_divisor: 10.0,
        }
    }

    const SKY: CurrentSky = CurrentSky {
        clear_sky_lux: 20_000.0,
        visibility_gain: 1.0,
        low_sun_gain: 1.0,
    };

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 12, 28, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-12-28T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-12-28T11:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-12-28T10:00"), Some(expected));
        assert_eq!(parse_timestamp("tomorrow"), None);
    }

    #[test]
    fn test_nearest_row_skips_bad_timestamps() {
        let mut broken = row(14, Some(0.0), None, None);
        broken.datetime = Some("soon".into());
        let missing = ForecastRow { datetime: None, ..row(15, Some(0.0), None, None) };
        let rows = vec![broken, missing, row(0, Some(50.0), None, None), row(40, Some(100.0), None, None)];

        let picked = nearest_row(&rows, now() + Duration::minutes(15)).unwrap();
        assert_eq!(picked.cloud_coverage, Some(50.0));
        let picked = nearest_row(&rows, now() + Duration::minutes(30)).unwrap();
        assert_eq!(picked.cloud_coverage, Some(100.0));
        assert!(nearest_row(&[], now()).is_none());
    }

    #[test]
    fn test_projection_uses_row_weather() {
        let rows = vec![row(10, Some(0.0), None, None), row(70, Some(100.0), None, Some(3.0))];
        let info = predict(&rows, now(), &SKY, 1000.0, &settings());

        assert_eq!(info.lux_15m, Some(20_000.0));
        // 10x clouds and 2.2x heavy rain
        assert_eq!(info.lux_60m, Some((20_000.0f64 / 22.0).round()));
        assert!(info.dark_soon);
    }

    #[test]
    fn test_condition_used_when_cloud_missing() {
        let rows = vec![row(15, None, Some("partlycloudy"), None)];
        let info = predict(&rows, now(), &SKY, 1000.0, &settings());
        assert_eq!(info.lux_15m, Some(10_000.0));
        assert!(!info.dark_soon);
    }

    #[test]
    fn test_disabled_horizons_and_empty_rows() {
        let only_30 = ForecastSettings { horizon_15m: false, horizon_60m: false, ..settings() };
        let rows = vec![row(30, Some(0.0), None, None)];
        let info = predict(&rows, now(), &SKY, 1000.0, &only_30);
        assert_eq!(info.lux_15m, None);
        assert_eq!(info.lux_30m, Some(20_000.0));
        assert_eq!(info.lux_60m, None);

        let empty = predict(&[], now(), &SKY, 1000.0, &settings());
        assert_eq!((empty.lux_15m, empty.lux_30m, empty.lux_60m), (None, None, None));
        assert!(!empty.dark_soon);
    }

    #[test]
    fn test_dark_soon_margin() {
        // 20000 / 10 = 2000 lx, just inside on (1800) + margin (200)
        let rows = vec![row(15, Some(100.0), None, None)];
        let info = predict(&rows, now(), &SKY, 1800.0, &settings());
        assert!(info.dark_soon);
        let info = predict(&rows, now(), &SKY, 1799.0, &settings());
        assert!(!info.dark_soon);
    }

    #[test]
    fn test_dark_soon_compares_whole_lux() {
        // 12004 / 10 = 1200.4 lx, reported and compared as 1200
        let sky = CurrentSky {
            clear_sky_lux: 12_004.0,
            ..SKY
        };
        let rows = vec![row(15, Some(100.0), None, None)];
        let info = predict(&rows, now(), &sky, 1000.0, &settings());
        assert_eq!(info.lux_15m, Some(1200.0));
        assert!(info.dark_soon);
    }
}
