use crate::models::illuminance::Thresholds;

pub const MIN_SENSITIVITY_PCT: f64 = 5.0;
pub const MAX_SENSITIVITY_PCT: f64 = 300.0;

/// Scales both thresholds by `clamp(sensitivity_pct, 5, 300) / 100`.
/// The configured percentage is kept as given.
pub fn effective_thresholds(on_lx: f64, off_lx: f64, sensitivity_pct: f64) -> Thresholds {
    let factor = sensitivity_pct.clamp(MIN_SENSITIVITY_PCT, MAX_SENSITIVITY_PCT) / 100.0;
    Thresholds {
        on_lx,
        off_lx,
        sensitivity_pct,
        on_eff_lx: on_lx * factor,
        off_eff_lx: off_lx * factor,
    }
}

/// Dark/light classifier with a dead band between the two thresholds.
///
/// Starts unknown; the first observation decides directly against the on
/// threshold. Afterwards values inside the band keep the previous state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DarkStateMachine {
    is_dark: Option<bool>,
}

impl DarkStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dark(&self) -> Option<bool> {
        self.is_dark
    }

    pub fn update(&mut self, control_lux: f64, thresholds: &Thresholds) -> bool {
        let next = match self.is_dark {
            None => control_lux <= thresholds.on_eff_lx,
            Some(_) if control_lux <= thresholds.on_eff_lx => true,
            Some(_) if control_lux >= thresholds.off_eff_lx => false,
            Some(current) => current,
        };
        self.is_dark = Some(next);
        next
    }
}
