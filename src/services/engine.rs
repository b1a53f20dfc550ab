/// ============================================================
///  Update orchestrator
///
///  One call turns an input snapshot into an immutable result:
///   1. Clear-sky lux from sun elevation
///   2. Attenuation factors → raw lux
///   3. EMA smoothing → control lux (+ trend history)
///   4. Hysteresis → is_dark
///   5. Daypart / twilight from geometry
///   6. Optional forecast projection and window exposure
///
///  State changes are staged on a copy and committed only after the
///  whole cycle succeeded.
/// ============================================================

use crate::config::{EngineConfig, FALLBACK_CLOUD_DIVISOR};
use crate::error::EngineError;
use crate::models::illuminance::{
    AttenuationFactors, InputSnapshot, NormalizedInputs, UpdateResult,
};
use crate::services::attenuation::{
    self, UNKNOWN_VISIBILITY_KM, attenuated_lux, cloud_divisor, low_sun_gain, rain_gain,
    visibility_gain,
};
use crate::services::clear_sky::clear_sky_lux;
use crate::services::daypart::{daypart, localized_label, twilight_flags};
use crate::services::forecast::{self, CurrentSky};
use crate::services::hysteresis::{DarkStateMachine, effective_thresholds};
use crate::services::smoothing::ExponentialSmoother;
use crate::services::trend::{self, LuxHistory};
use crate::services::window_exposure;

/// Everything that carries over from one cycle to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    pub dark: DarkStateMachine,
    pub smoother: ExponentialSmoother,
    pub history: LuxHistory,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }
}

fn finite(quantity: &'static str, value: f64) -> Result<f64, EngineError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::NonFinite { quantity })
    }
}

pub fn update(
    snapshot: &InputSnapshot,
    config: &EngineConfig,
    state: &mut EngineState,
) -> Result<UpdateResult, EngineError> {
    let now = snapshot.taken_at;
    let elevation = finite("sun elevation", snapshot.sun_elevation_deg)?;
    let azimuth = snapshot.sun_azimuth_deg.filter(|az| az.is_finite());
    let condition = snapshot
        .weather_condition
        .as_deref()
        .filter(|c| !c.is_empty());
    let cloud_pct = snapshot.cloud_cover_pct.filter(|c| c.is_finite());
    let precip_mm_h = attenuation::precipitation_mm_per_hour(snapshot.precipitation);
    let visibility_km = attenuation::visibility_km(snapshot.visibility);

    // ── 1-2. Clear sky and damping ───────────────────────────
    let clear = clear_sky_lux(elevation, config.mode);
    let factors = AttenuationFactors {
        cloud_divisor: cloud_divisor(cloud_pct, condition, config.max_cloud_divisor, FALLBACK_CLOUD_DIVISOR),
        rain_gain: rain_gain(precip_mm_h),
        visibility_gain: visibility_gain(visibility_km, condition),
        low_sun_gain: low_sun_gain(elevation),
    };
    let raw_lux = finite("raw lux", attenuated_lux(clear, &factors))?;

    // ── 3. Smoothing and history ─────────────────────────────
    let mut next = state.clone();
    let control_lux = finite(
        "control lux",
        next.smoother.apply(
            raw_lux,
            f64::from(config.scan_period_seconds),
            config.smoothing_tau_seconds,
        ),
    )?;
    next.history.push(now, control_lux);
    let trend = config
        .trend_enabled
        .then(|| trend::analyze(&next.history, now, control_lux, &config.trend));

    // ── 4. Hysteresis ────────────────────────────────────────
    let thresholds = effective_thresholds(
        config.on_threshold_lx,
        config.off_threshold_lx,
        config.dark_sensitivity_pct,
    );
    let is_dark = next.dark.update(control_lux, &thresholds);

    // ── 5. Geometry-only labels ──────────────────────────────
    let part = daypart(elevation, azimuth, snapshot.latitude);
    let daypart_label = localized_label(part.as_str(), &snapshot.language).to_string();
    let twilight = config.twilight_enabled.then(|| twilight_flags(elevation));

    // ── 6. Forecast and windows ──────────────────────────────
    let forecast = match (&snapshot.forecast, config.forecast_enabled) {
        (Some(rows), true) => {
            let sky = CurrentSky {
                clear_sky_lux: clear,
                visibility_gain: factors.visibility_gain,
                low_sun_gain: factors.low_sun_gain,
            };
            Some(forecast::predict(rows, now, &sky, thresholds.on_eff_lx, &config.forecast))
        }
        _ => None,
    };
    let windows = match (azimuth, config.windows_enabled) {
        (Some(az), true) => Some(window_exposure::evaluate(
            &config.windows,
            elevation,
            az,
            clear,
            config.glare_enabled,
        )),
        _ => None,
    };

    *state = next;

    tracing::debug!(
        "cycle: elev={:.2}° clear={:.0} lx raw={:.0} lx control={:.0} lx dark={} ({})",
        elevation,
        clear,
        raw_lux,
        control_lux,
        is_dark,
        part.as_str()
    );

    Ok(UpdateResult {
        computed_at: now,
        mode: config.mode,
        raw_lux,
        control_lux,
        clear_sky_lux: clear,
        is_dark,
        thresholds,
        daypart: part,
        daypart_label,
        elevation_deg: elevation,
        azimuth_deg: azimuth,
        attenuation: factors,
        inputs: NormalizedInputs {
            weather_condition: condition.map(str::to_string),
            cloud_cover_pct: cloud_pct,
            precipitation_mm_h: precip_mm_h.unwrap_or(0.0),
            visibility_km: visibility_km.unwrap_or(UNKNOWN_VISIBILITY_KM),
        },
        smoothing_tau_seconds: config.smoothing_tau_seconds,
        trend,
        forecast,
        twilight,
        windows,
    })
}
