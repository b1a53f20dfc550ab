use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::models::illuminance::TrendInfo;

pub const HISTORY_CAPACITY: usize = 512;
const MIN_SPAN_MINUTES: f64 = 1e-6;

/// Bounded, time-ordered record of control lux samples. The oldest sample
/// is evicted once the buffer is full.
#[derive(Debug, Clone, PartialEq)]
pub struct LuxHistory {
    samples: VecDeque<(DateTime<Utc>, f64)>,
    capacity: usize,
}

impl Default for LuxHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl LuxHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn oldest(&self) -> Option<(DateTime<Utc>, f64)> {
        self.samples.front().copied()
    }

    pub fn push(&mut self, at: DateTime<Utc>, lux: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((at, lux));
    }

    /// Rate of change in lx/min between `current` and the earliest sample
    /// inside the window. Falls back to the oldest sample when the window
    /// holds none.
    pub fn rate(&self, now: DateTime<Utc>, window_minutes: u32, current: f64) -> Option<f64> {
        if window_minutes == 0 || self.samples.is_empty() {
            return None;
        }
        let horizon = now - chrono::Duration::minutes(i64::from(window_minutes));
        let (at, lux) = self
            .samples
            .iter()
            .find(|(at, _)| *at >= horizon)
            .or_else(|| self.samples.front())
            .copied()?;

        let span_min = (now - at).num_milliseconds() as f64 / 60_000.0;
        Some((current - lux) / span_min.max(MIN_SPAN_MINUTES))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSettings {
    pub short_window_min: u32,
    pub long_window_min: u32,
    /// lx/min, negative
    pub darkening_threshold: f64,
    /// lx/min, positive
    pub brightening_threshold: f64,
}

/// Evaluates both windows; the fast flags follow the short window only.
pub fn analyze(history: &LuxHistory, now: DateTime<Utc>, current: f64, settings: &TrendSettings) -> TrendInfo {
    let short = history.rate(now, settings.short_window_min, current);
    let long = history.rate(now, settings.long_window_min, current);
    TrendInfo {
        short_lx_per_min: short,
        long_lx_per_min: long,
        darkening_fast: short.map(|r| r <= settings.darkening_threshold),
        brightening_fast: short.map(|r| r >= settings.brightening_threshold),
    }
}
