//! CLI Interface: keyboard stand-in, terminal rendering and log files
//!
//! # Components
//! - `input.rs`: Keystroke capture and the keyboard stand-in for the sensor
//! - `display.rs`: Terminal rendering of presentation intents
//! - `recorder.rs`: CSV files for frame and sequence records

pub mod display;
pub mod input;
pub mod recorder;
