//! Experiment configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to the stock
//! two-hand experiment. The core never reads files, it only receives the pieces
//! built here (channel limits, filter parameters, protocol, catalog).

use crate::error::{Error, Result};
use crate::session::{Hand, ProtocolConfig, SequenceCatalog, SequenceDef, TrialStateMachine};
use crate::signal::{ChannelLimits, FilterParams, SignalConditioner};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Physical channels reported by the sensor (both hands)
    pub num_fingers: usize,
    /// Keys per hand shown and scored
    pub num_active_fingers: usize,

    pub valid_angle_min: f64,
    pub valid_angle_max: f64,
    pub display_angle_min: f64,
    /// Press threshold and top of the display range
    pub display_angle_max: f64,
    /// Release threshold; defaults to `display_angle_max` (no hysteresis)
    pub release_angle: Option<f64>,

    pub use_filter: bool,
    pub filter_fc_min: f64,
    pub filter_beta: f64,
    pub filter_d_cutoff: f64,

    pub start_wait_time: f64,
    pub cue_time: f64,
    pub feedback_time: f64,
    pub iti_time: f64,
    pub seq_per_trial: usize,
    pub trials_per_run: usize,
    pub num_runs: usize,

    pub sequences: FxHashMap<String, SequenceDef>,
    pub sequence_order: Vec<String>,
    pub start_hand: Hand,
    /// Keys needed for the start gesture; defaults to all active keys
    pub start_keys_required: Option<usize>,

    /// Write frame and sequence logs; off for demo sessions
    pub log_records: bool,
    /// Decimals kept for angles in the frame log
    pub finger_round: usize,
    /// Decimals kept for times in both logs
    pub time_round: usize,

    /// Keyboard stand-in: one key per channel
    pub key_codes: Vec<char>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        let mut sequences = FxHashMap::default();
        sequences.insert(
            "A".to_string(),
            SequenceDef {
                seq: vec![4, 2, 3, 1, 0],
                hand: Hand::Left,
            },
        );
        sequences.insert(
            "B".to_string(),
            SequenceDef {
                seq: vec![1, 3, 2, 4, 0],
                hand: Hand::Right,
            },
        );

        ExperimentConfig {
            num_fingers: 10,
            num_active_fingers: 5,
            valid_angle_min: -20.0,
            valid_angle_max: 120.0,
            display_angle_min: 0.0,
            display_angle_max: 40.0,
            release_angle: None,
            use_filter: true,
            filter_fc_min: 1.0,
            filter_beta: 0.05,
            filter_d_cutoff: 1.0,
            start_wait_time: 0.5,
            cue_time: 1.5,
            feedback_time: 1.0,
            iti_time: 1.0,
            seq_per_trial: 3,
            trials_per_run: 4,
            num_runs: 2,
            sequences,
            sequence_order: vec!["A".to_string(), "B".to_string()],
            start_hand: Hand::Left,
            start_keys_required: None,
            log_records: true,
            finger_round: 3,
            time_round: 4,
            key_codes: "qwervnuiop".chars().collect(),
        }
    }
}

impl ExperimentConfig {
    /// Read and validate a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        info!(path = %path.display(), sequences = config.sequences.len(), "configuration loaded");
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: ExperimentConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked without running
    pub fn validate(&self) -> Result<()> {
        self.limits().validate()?;
        self.filter_params().validate()?;
        self.protocol().validate()?;
        self.catalog()?;

        let mut hands = vec![self.start_hand];
        hands.extend(self.sequences.values().map(|def| def.hand));
        for hand in hands {
            let needed = hand.channel_offset(self.num_active_fingers) + self.num_active_fingers;
            if needed > self.num_fingers {
                return Err(Error::InvalidConfig(format!(
                    "{} hand needs {} channels but only {} are configured",
                    hand, needed, self.num_fingers
                )));
            }
        }

        if self.key_codes.len() < self.num_fingers {
            return Err(Error::InvalidConfig(format!(
                "{} key codes for {} channels",
                self.key_codes.len(),
                self.num_fingers
            )));
        }
        Ok(())
    }

    pub fn limits(&self) -> ChannelLimits {
        ChannelLimits {
            valid_min: self.valid_angle_min,
            valid_max: self.valid_angle_max,
            display_min: self.display_angle_min,
            press_threshold: self.display_angle_max,
            release_threshold: self.release_angle.unwrap_or(self.display_angle_max),
        }
    }

    pub fn filter_params(&self) -> FilterParams {
        FilterParams::new(self.filter_fc_min, self.filter_beta, self.filter_d_cutoff)
    }

    pub fn protocol(&self) -> ProtocolConfig {
        ProtocolConfig {
            cue_time: self.cue_time,
            feedback_time: self.feedback_time,
            iti_time: self.iti_time,
            start_wait_time: self.start_wait_time,
            seq_per_trial: self.seq_per_trial,
            trials_per_run: self.trials_per_run,
            num_runs: self.num_runs,
            active_keys: self.num_active_fingers,
            start_hand: self.start_hand,
            start_keys_required: self
                .start_keys_required
                .unwrap_or(self.num_active_fingers),
        }
    }

    pub fn catalog(&self) -> Result<SequenceCatalog> {
        SequenceCatalog::new(
            &self.sequences,
            &self.sequence_order,
            self.num_active_fingers,
        )
    }

    /// Signal path for all channels, filtering on or off per `use_filter`
    pub fn conditioner(&self) -> Result<SignalConditioner> {
        let mut conditioner =
            SignalConditioner::new(self.num_fingers, self.limits(), self.filter_params())?;
        conditioner.set_filtering(self.use_filter);
        Ok(conditioner)
    }

    pub fn state_machine(&self) -> Result<TrialStateMachine> {
        TrialStateMachine::new(self.protocol(), self.catalog()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert!(config.conditioner().is_ok());
        assert!(config.state_machine().is_ok());
        assert_eq!(config.protocol().start_keys_required, 5);
        assert_eq!(config.filter_params(), FilterParams::default());
        assert!(config.log_records);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "cue_time": 2.0,
            "num_runs": 1,
            "release_angle": 35.0,
            "sequences": { "x": { "seq": [2, 0, 1], "hand": "right" } },
            "sequence_order": ["x"]
        }"#;
        let config = ExperimentConfig::from_json(json).unwrap();
        assert_eq!(config.cue_time, 2.0);
        assert_eq!(config.num_runs, 1);
        assert_eq!(config.feedback_time, 1.0);
        assert_eq!(config.limits().release_threshold, 35.0);
        assert_eq!(config.limits().press_threshold, 40.0);
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.get("x").unwrap().hand, Hand::Right);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_filter = r#"{ "filter_beta": 0.0 }"#;
        assert!(matches!(
            ExperimentConfig::from_json(bad_filter),
            Err(Error::InvalidFilterParameter { name: "beta", .. })
        ));

        let bad_seq = r#"{ "sequences": { "x": { "seq": [7], "hand": "left" } }, "sequence_order": ["x"] }"#;
        assert!(matches!(
            ExperimentConfig::from_json(bad_seq),
            Err(Error::KeyOutOfRange { .. })
        ));

        let missing = r#"{ "sequence_order": ["nope"] }"#;
        assert!(matches!(
            ExperimentConfig::from_json(missing),
            Err(Error::UnknownSequence(_))
        ));

        let too_few_channels = r#"{ "num_fingers": 5 }"#;
        assert!(ExperimentConfig::from_json(too_few_channels).is_err());

        assert!(matches!(
            ExperimentConfig::from_json("{ not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.json");
        let config = ExperimentConfig::load(path).unwrap();
        assert_eq!(config, ExperimentConfig::default());
    }

    #[test]
    fn test_samples_drive_a_sequence() {
        use crate::session::{FrameInput, LogRecord, Stage};

        let config = ExperimentConfig::default();
        let mut conditioner = config.conditioner().unwrap();
        let mut machine = config.state_machine().unwrap();
        let mut tick = 0u32;
        let mut records = Vec::new();

        // one frame per call; `held` lists channels pushed past the threshold
        let mut frame = |held: &[usize]| {
            tick += 1;
            let mut samples = vec![0.0; config.num_fingers];
            for &ch in held {
                samples[ch] = 44.0;
            }
            conditioner.ingest_frame(&samples, 0.01);
            let edges = conditioner.drain_edges();
            let out = machine.step(&FrameInput {
                now: tick as f64 * 0.01,
                edges: &edges,
                levels: &conditioner.levels(),
                filtered: &conditioner.filtered_angles(),
            });
            records.extend(out.records);
            out.intent.stage
        };

        // hold all left keys until the filtered angles cross, then release
        let mut stage = Stage::Wait;
        for _ in 0..300 {
            stage = frame(&[0, 1, 2, 3, 4]);
            if stage == Stage::Cue {
                break;
            }
        }
        assert_eq!(stage, Stage::Cue);
        for _ in 0..400 {
            stage = frame(&[]);
            if stage == Stage::Press {
                break;
            }
        }
        assert_eq!(stage, Stage::Press);

        let keys = [4, 2, 3, 1, 0];
        for (i, key) in keys.into_iter().enumerate() {
            for _ in 0..60 {
                stage = frame(&[key]);
            }
            if i + 1 < keys.len() {
                for _ in 0..120 {
                    frame(&[]);
                }
            }
        }
        assert_eq!(stage, Stage::Feedback);

        let done: Vec<_> = records
            .iter()
            .filter_map(|r| match r {
                LogRecord::Sequence(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].points, 1);
        assert_eq!(done[0].sequence_id, "A");
    }

    #[test]
    fn test_logging_can_be_disabled() {
        use crate::session::{DiscardSink, FrameInput, RecordSink, TrialStateMachine};

        let config = ExperimentConfig::from_json(r#"{ "log_records": false }"#).unwrap();
        assert!(!config.log_records);
        assert_eq!(config.cue_time, 1.5);

        // a demo session still runs, its records go nowhere
        let mut sink = DiscardSink;
        let mut machine: TrialStateMachine = config.state_machine().unwrap();
        let levels = vec![true; config.num_fingers];
        let filtered = vec![0.0; config.num_fingers];
        let mut produced = 0;
        for tick in 0..300 {
            let out = machine.step(&FrameInput {
                now: tick as f64 * 0.01,
                edges: &[],
                levels: &levels,
                filtered: &filtered,
            });
            for record in &out.records {
                produced += 1;
                sink.record(record).unwrap();
            }
        }
        assert!(produced > 0);
        sink.flush().unwrap();
    }

    #[test]
    fn test_filter_toggle_from_config() {
        let config = ExperimentConfig::from_json(r#"{ "use_filter": false }"#).unwrap();
        assert!(!config.conditioner().unwrap().filtering());
    }
}
