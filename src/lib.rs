//! Finger Sequence Trainer - signal conditioning and trial protocol core
//!
//! A participant presses keys (or bends sensorized fingers) in cued sequences.
//! The core turns continuous, noisy per-finger angles into clean press events
//! and runs them through a timed protocol with history-relative scoring.
//!
//! # Modules
//! - `signal`: AdaptiveFilter and SignalConditioner
//! - `session`: sequences, TrialStateMachine, scoring, ledger, intents, records
//! - `config`: ExperimentConfig (JSON) and builders for the above
//!
//! # Frame loop
//!
//! ```rust
//! use finger_seq_trainer::config::ExperimentConfig;
//! use finger_seq_trainer::session::FrameInput;
//!
//! let config = ExperimentConfig::default();
//! let mut conditioner = config.conditioner().unwrap();
//! let mut machine = config.state_machine().unwrap();
//!
//! let samples = vec![0.0; config.num_fingers];
//! conditioner.ingest_frame(&samples, 1.0 / 60.0);
//! let edges = conditioner.drain_edges();
//! let out = machine.step(&FrameInput {
//!     now: 1.0 / 60.0,
//!     edges: &edges,
//!     levels: &conditioner.levels(),
//!     filtered: &conditioner.filtered_angles(),
//! });
//! assert!(!out.finished);
//! ```

pub mod config;
pub mod error;
pub mod session;
pub mod signal;

pub use config::ExperimentConfig;
pub use error::{Error, Result};
