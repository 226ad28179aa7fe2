//! Per-channel signal conditioning: validate, filter, detect presses
//!
//! Each frame every channel receives one raw angle sample. Samples outside the
//! valid range are dropped (the channel keeps its previous angle), accepted
//! samples go through the channel's [`AdaptiveFilter`], and the filtered angle
//! is compared against the press threshold to derive:
//! - `level`: the channel is currently held past the threshold
//! - `edge`: the channel crossed the threshold on the way up
//!
//! Edges latch until [`SignalConditioner::drain_edges`] collects them.

use super::filter::{AdaptiveFilter, FilterParams};
use crate::error::{Error, Result};
use tracing::trace;

/// Linear map of `value` from `[in_min, in_max]` onto `[out_min, out_max]`,
/// clamping the input to its range first
pub fn map_to_display(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    let span = in_max - in_min;
    if span == 0.0 {
        return out_min;
    }
    let clamped = value.clamp(in_min.min(in_max), in_min.max(in_max));
    out_min + (out_max - out_min) * (clamped - in_min) / span
}

/// Static limits shared by all channels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelLimits {
    /// Lowest physically plausible sample
    pub valid_min: f64,
    /// Highest physically plausible sample
    pub valid_max: f64,
    /// Resting angle, bottom of the display range
    pub display_min: f64,
    /// Level rises at or above this angle (also the top of the display range)
    pub press_threshold: f64,
    /// Level falls below this angle (equal to `press_threshold` for no hysteresis)
    pub release_threshold: f64,
}

impl ChannelLimits {
    pub fn validate(&self) -> Result<()> {
        if !(self.valid_min <= self.valid_max) {
            return Err(Error::InvalidConfig(format!(
                "valid angle range is empty: [{}, {}]",
                self.valid_min, self.valid_max
            )));
        }
        if !(self.display_min < self.press_threshold) {
            return Err(Error::InvalidConfig(format!(
                "display angle min {} must be below the press threshold {}",
                self.display_min, self.press_threshold
            )));
        }
        if !(self.release_threshold <= self.press_threshold) {
            return Err(Error::InvalidConfig(format!(
                "release threshold {} above press threshold {}",
                self.release_threshold, self.press_threshold
            )));
        }
        Ok(())
    }

    fn accepts(&self, sample: f64) -> bool {
        sample >= self.valid_min && sample <= self.valid_max
    }
}

/// One finger lane
#[derive(Clone, Debug)]
struct Channel {
    raw: f64,
    filtered: f64,
    level: bool,
    edge: bool,
    filter: AdaptiveFilter,
    /// Time of rejected frames not yet seen by the filter
    carried_dt: f64,
}

/// Owns every channel's filter and press state
#[derive(Clone, Debug)]
pub struct SignalConditioner {
    channels: Vec<Channel>,
    limits: ChannelLimits,
    filtering: bool,
}

impl SignalConditioner {
    /// Create `count` channels resting at `display_min`
    pub fn new(count: usize, limits: ChannelLimits, params: FilterParams) -> Result<Self> {
        limits.validate()?;
        let filter = AdaptiveFilter::new(params)?;
        let channels = (0..count)
            .map(|_| Channel {
                raw: limits.display_min,
                filtered: limits.display_min,
                level: false,
                edge: false,
                filter: filter.clone(),
                carried_dt: 0.0,
            })
            .collect();

        Ok(SignalConditioner {
            channels,
            limits,
            filtering: true,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn limits(&self) -> &ChannelLimits {
        &self.limits
    }

    /// Feed one sample to channel `ch`; `dt` is seconds since its previous sample
    pub fn ingest(&mut self, ch: usize, sample: f64, dt: f64) {
        let limits = self.limits;
        let filtering = self.filtering;
        let Some(channel) = self.channels.get_mut(ch) else {
            return;
        };

        if !limits.accepts(sample) {
            trace!(channel = ch, sample, "sample outside valid range, keeping previous");
            if dt > 0.0 {
                channel.carried_dt += dt;
            }
            return;
        }

        let dt = dt.max(0.0) + std::mem::take(&mut channel.carried_dt);
        channel.raw = sample;
        channel.filtered = if filtering {
            channel.filter.smooth(sample, Some(dt))
        } else {
            sample
        };

        let was_held = channel.level;
        channel.level = if was_held {
            channel.filtered >= limits.release_threshold
        } else {
            channel.filtered >= limits.press_threshold
        };
        if channel.level && !was_held {
            channel.edge = true;
        }
    }

    /// Feed one frame of samples, one per channel, sharing the same `dt`
    pub fn ingest_frame(&mut self, samples: &[f64], dt: f64) {
        for (ch, &sample) in samples.iter().enumerate().take(self.channels.len()) {
            self.ingest(ch, sample, dt);
        }
    }

    /// Channels that rose past the threshold since the last drain, ascending
    pub fn drain_edges(&mut self) -> Vec<usize> {
        self.channels
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, channel)| {
                if std::mem::take(&mut channel.edge) {
                    Some(idx)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn set_filtering(&mut self, enabled: bool) {
        self.filtering = enabled;
    }

    pub fn toggle_filter(&mut self) {
        self.filtering = !self.filtering;
    }

    pub fn filtering(&self) -> bool {
        self.filtering
    }

    pub fn raw(&self, ch: usize) -> Option<f64> {
        self.channels.get(ch).map(|c| c.raw)
    }

    pub fn filtered(&self, ch: usize) -> Option<f64> {
        self.channels.get(ch).map(|c| c.filtered)
    }

    pub fn level(&self, ch: usize) -> bool {
        self.channels.get(ch).map(|c| c.level).unwrap_or(false)
    }

    pub fn filtered_angles(&self) -> Vec<f64> {
        self.channels.iter().map(|c| c.filtered).collect()
    }

    pub fn levels(&self) -> Vec<bool> {
        self.channels.iter().map(|c| c.level).collect()
    }

    /// Filtered angle of `ch` mapped to `[0, 1]` over the display range
    pub fn key_position(&self, ch: usize) -> f64 {
        let filtered = self.filtered(ch).unwrap_or(self.limits.display_min);
        map_to_display(
            filtered,
            self.limits.display_min,
            self.limits.press_threshold,
            0.0,
            1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ChannelLimits {
        ChannelLimits {
            valid_min: -10.0,
            valid_max: 100.0,
            display_min: 0.0,
            press_threshold: 40.0,
            release_threshold: 40.0,
        }
    }

    fn conditioner(count: usize) -> SignalConditioner {
        let mut sc = SignalConditioner::new(count, limits(), FilterParams::default()).unwrap();
        sc.set_filtering(false);
        sc
    }

    #[test]
    fn test_map_to_display_clamps() {
        assert_eq!(map_to_display(20.0, 0.0, 40.0, 0.0, 1.0), 0.5);
        assert_eq!(map_to_display(80.0, 0.0, 40.0, 0.0, 1.0), 1.0);
        assert_eq!(map_to_display(-5.0, 0.0, 40.0, -0.2, 0.2), -0.2);
        assert_eq!(map_to_display(3.0, 5.0, 5.0, 1.0, 2.0), 1.0);
    }

    #[test]
    fn test_one_edge_per_rise() {
        let mut sc = conditioner(1);
        let mut edges = 0;
        for _ in 0..3 {
            for _ in 0..5 {
                sc.ingest(0, 0.0, 0.01);
                edges += sc.drain_edges().len();
            }
            for _ in 0..20 {
                sc.ingest(0, 50.0, 0.01);
                edges += sc.drain_edges().len();
            }
        }
        assert_eq!(edges, 3);
    }

    #[test]
    fn test_one_edge_per_rise_filtered() {
        let mut sc = SignalConditioner::new(1, limits(), FilterParams::new(5.0, 0.1, 1.0)).unwrap();
        let mut edges = 0;
        for _ in 0..4 {
            for _ in 0..200 {
                sc.ingest(0, 0.0, 0.01);
                edges += sc.drain_edges().len();
            }
            assert!(!sc.level(0));
            for _ in 0..200 {
                sc.ingest(0, 60.0, 0.01);
                edges += sc.drain_edges().len();
            }
            assert!(sc.level(0));
        }
        assert_eq!(edges, 4);
    }

    #[test]
    fn test_edges_latch_until_drained() {
        let mut sc = conditioner(3);
        sc.ingest_frame(&[50.0, 0.0, 50.0], 0.01);
        sc.ingest_frame(&[50.0, 0.0, 50.0], 0.01);
        assert_eq!(sc.drain_edges(), vec![0, 2]);
        assert!(sc.drain_edges().is_empty());
        assert_eq!(sc.levels(), vec![true, false, true]);
    }

    #[test]
    fn test_falling_edge_only_clears_level() {
        let mut sc = conditioner(1);
        sc.ingest(0, 50.0, 0.01);
        sc.drain_edges();
        sc.ingest(0, 10.0, 0.01);
        assert!(!sc.level(0));
        assert!(sc.drain_edges().is_empty());
    }

    #[test]
    fn test_out_of_range_sample_is_ignored() {
        let mut sc = SignalConditioner::new(1, limits(), FilterParams::default()).unwrap();
        for _ in 0..10 {
            sc.ingest(0, 12.0, 0.01);
        }
        let raw = sc.raw(0).unwrap();
        let filtered = sc.filtered(0).unwrap();

        sc.ingest(0, 500.0, 0.01);
        assert_eq!(sc.raw(0).unwrap(), raw);
        assert_eq!(sc.filtered(0).unwrap(), filtered);

        sc.ingest(0, -11.0, 0.01);
        assert_eq!(sc.raw(0).unwrap(), raw);
        assert_eq!(sc.filtered(0).unwrap(), filtered);
    }

    #[test]
    fn test_rejected_frames_carry_time() {
        let mut sc = SignalConditioner::new(1, limits(), FilterParams::default()).unwrap();
        sc.ingest(0, 1.0, 0.01);
        sc.ingest(0, 1000.0, 0.01);
        sc.ingest(0, 1000.0, 0.01);
        sc.ingest(0, 2.0, 0.01);
        let freq = sc.channels[0].filter.frequency();
        assert!((freq - 1.0 / 0.03).abs() < 1e-6, "freq={}", freq);
    }

    #[test]
    fn test_hysteresis_band() {
        let mut band = limits();
        band.release_threshold = 30.0;
        let mut sc = SignalConditioner::new(1, band, FilterParams::default()).unwrap();
        sc.set_filtering(false);

        sc.ingest(0, 41.0, 0.01);
        assert_eq!(sc.drain_edges(), vec![0]);
        // chatter inside the band keeps the key held
        for sample in [39.0, 35.0, 41.0, 31.0, 40.0] {
            sc.ingest(0, sample, 0.01);
            assert!(sc.level(0));
        }
        assert!(sc.drain_edges().is_empty());

        sc.ingest(0, 29.0, 0.01);
        assert!(!sc.level(0));
        sc.ingest(0, 40.0, 0.01);
        assert_eq!(sc.drain_edges(), vec![0]);
    }

    #[test]
    fn test_filter_toggle_passthrough() {
        let mut sc = SignalConditioner::new(1, limits(), FilterParams::default()).unwrap();
        sc.ingest(0, 0.0, 0.01);
        sc.ingest(0, 20.0, 0.01);
        assert!(sc.filtered(0).unwrap() < 20.0);

        sc.toggle_filter();
        assert!(!sc.filtering());
        sc.ingest(0, 25.0, 0.01);
        assert_eq!(sc.filtered(0).unwrap(), 25.0);
    }

    #[test]
    fn test_key_position() {
        let mut sc = conditioner(2);
        sc.ingest_frame(&[10.0, 90.0], 0.01);
        assert!((sc.key_position(0) - 0.25).abs() < 1e-12);
        assert_eq!(sc.key_position(1), 1.0);
    }

    #[test]
    fn test_invalid_limits() {
        let mut bad = limits();
        bad.release_threshold = 45.0;
        assert!(SignalConditioner::new(1, bad, FilterParams::default()).is_err());
    }
}
