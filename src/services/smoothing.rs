/// Exponential moving average over the raw lux series.
///
/// The weight is derived from the time constant and the sampling period on
/// every call, so a configuration reload changes the response without
/// discarding the accumulated value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExponentialSmoother {
    ema: Option<f64>,
}

/// `1 − exp(−period / max(1, tau))`, or `None` when smoothing is off.
pub fn smoothing_alpha(scan_period_s: f64, tau_s: f64) -> Option<f64> {
    if tau_s <= 0.0 {
        return None;
    }
    Some(1.0 - (-scan_period_s / tau_s.max(1.0)).exp())
}

impl ExponentialSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Option<f64> {
        self.ema
    }

    pub fn apply(&mut self, raw: f64, scan_period_s: f64, tau_s: f64) -> f64 {
        let Some(alpha) = smoothing_alpha(scan_period_s, tau_s) else {
            // Disabled: pass through and track the input so re-enabling starts here
            self.ema = Some(raw);
            return raw;
        };
        let next = match self.ema {
            None => raw,
            Some(ema) => (1.0 - alpha) * ema + alpha * raw,
        };
        self.ema = Some(next);
        next
    }
}
