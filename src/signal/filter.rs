//! Adaptive low-pass filtering for a single scalar channel
//!
//! Features:
//! - Single-pole low-pass stage with per-call blend coefficient
//! - Velocity-adaptive cutoff (one-euro style): slow motion is smoothed hard,
//!   fast motion raises the cutoff so the output keeps up
//! - Sampling frequency re-measured from every positive time delta

use crate::error::{Error, Result};
use std::f64::consts::PI;

/// Sampling frequency assumed until the first positive `dt` arrives (Hz)
pub const DEFAULT_FREQ: f64 = 120.0;

/// Blend coefficient for a single-pole low-pass at `cutoff` Hz sampled at `freq` Hz
fn alpha(freq: f64, cutoff: f64) -> f64 {
    let te = 1.0 / freq;
    let tau = 1.0 / (2.0 * PI * cutoff);
    1.0 / (1.0 + tau / te)
}

/// Exponential smoother that remembers its last input and last output
#[derive(Clone, Debug, Default)]
pub struct LowPass {
    /// Last raw input (None before the first call)
    last_input: Option<f64>,
    /// Last smoothed output
    last_output: f64,
}

impl LowPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blend `value` into the running output. The first call returns `value` as-is.
    pub fn apply(&mut self, value: f64, alpha: f64) -> f64 {
        let out = match self.last_input {
            None => value,
            Some(_) => alpha * value + (1.0 - alpha) * self.last_output,
        };
        self.last_input = Some(value);
        self.last_output = out;
        out
    }

    /// Last raw input seen by this stage
    pub fn last_input(&self) -> Option<f64> {
        self.last_input
    }
}

/// Fixed parameters of an [`AdaptiveFilter`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterParams {
    /// Minimum cutoff frequency (Hz)
    pub mincutoff: f64,
    /// Speed coefficient
    pub beta: f64,
    /// Cutoff used to smooth the derivative estimate (Hz)
    pub dcutoff: f64,
    /// Sampling frequency until the first measured delta (Hz)
    pub initial_freq: f64,
}

impl FilterParams {
    pub fn new(mincutoff: f64, beta: f64, dcutoff: f64) -> Self {
        FilterParams {
            mincutoff,
            beta,
            dcutoff,
            initial_freq: DEFAULT_FREQ,
        }
    }

    /// Every parameter must be strictly positive (NaN is rejected too)
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("mincutoff", self.mincutoff),
            ("beta", self.beta),
            ("dcutoff", self.dcutoff),
            ("freq", self.initial_freq),
        ];
        for (name, value) in checks {
            if !(value > 0.0) {
                return Err(Error::InvalidFilterParameter { name, value });
            }
        }
        Ok(())
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        FilterParams::new(1.0, 0.05, 1.0)
    }
}

/// Velocity-adaptive low-pass filter for one channel
#[derive(Clone, Debug)]
pub struct AdaptiveFilter {
    params: FilterParams,
    /// Current sampling frequency, always > 0
    freq: f64,
    /// Smoother for the value itself
    value: LowPass,
    /// Smoother for the rate-of-change estimate
    rate: LowPass,
}

impl AdaptiveFilter {
    /// Build a filter, failing fast on non-positive parameters
    pub fn new(params: FilterParams) -> Result<Self> {
        params.validate()?;
        Ok(AdaptiveFilter {
            params,
            freq: params.initial_freq,
            value: LowPass::new(),
            rate: LowPass::new(),
        })
    }

    /// Smooth `value`. `dt` is the time since the previous call in seconds;
    /// `None` or a non-positive delta keeps the previous sampling frequency.
    pub fn smooth(&mut self, value: f64, dt: Option<f64>) -> f64 {
        if let Some(dt) = dt.filter(|dt| *dt > 0.0) {
            let freq = 1.0 / dt;
            if freq.is_finite() {
                self.freq = freq;
            }
        }

        let dx = match self.value.last_input() {
            None => 0.0,
            Some(prev) => (value - prev) * self.freq,
        };
        let edx = self.rate.apply(dx, alpha(self.freq, self.params.dcutoff));

        let cutoff = self.params.mincutoff + self.params.beta * edx.abs();
        self.value.apply(value, alpha(self.freq, cutoff))
    }

    /// Sampling frequency used by the last call (Hz)
    pub fn frequency(&self) -> f64 {
        self.freq
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }
}
