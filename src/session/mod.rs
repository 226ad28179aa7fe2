//! Session Management: sequences, trial protocol, scoring and bookkeeping
//!
//! # Components
//! - `sequence.rs`: Sequence definitions and the SequenceCatalog
//! - `trial.rs`: TrialStateMachine (wait/cue/press/feedback/iti)
//! - `scoring.rs`: ScoringEngine (median-relative reward tiers)
//! - `ledger.rs`: SessionLedger (counters, history, score)
//! - `intent.rs`: Presentation intents for the display layer
//! - `records.rs`: Frame and sequence log records

pub mod intent;
pub mod ledger;
pub mod records;
pub mod scoring;
pub mod sequence;
pub mod trial;

pub use intent::{CueText, Palette, PresentationIntent, Stage};
pub use ledger::{SessionLedger, SessionSummary};
pub use records::{DiscardSink, FrameRecord, LogRecord, RecordSink, SequenceRecord};
pub use scoring::{median, Outcome, ScoringEngine, Tier};
pub use sequence::{Hand, Sequence, SequenceCatalog, SequenceDef};
pub use trial::{Attempt, FrameInput, ProtocolConfig, StepOutput, TrialStateMachine};
