//! Signal path: raw finger angles in, press events out
//!
//! # Components
//! - `filter.rs`: AdaptiveFilter (velocity-adaptive low-pass)
//! - `conditioner.rs`: SignalConditioner (range check, filtering, edge detection)

pub mod conditioner;
pub mod filter;

pub use conditioner::{map_to_display, ChannelLimits, SignalConditioner};
pub use filter::{AdaptiveFilter, FilterParams, LowPass};
