//! Log records emitted by the trial state machine
//!
//! The machine never writes files itself; it hands records to whatever
//! [`RecordSink`] the caller provides.

use super::sequence::Hand;
use crate::error::Result;

/// One frame of the press stage
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRecord {
    /// Seconds since the press stage started
    pub trial_elapsed_time: f64,
    /// Filtered angle of every channel
    pub filtered_angles: Vec<f64>,
    pub hand: Hand,
    pub sequence_id: String,
    pub sequence_execution_index: usize,
    pub run_index: usize,
}

/// One completed sequence
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceRecord {
    /// Last press time minus first press time
    pub sequence_total_time: f64,
    /// Time of each press since the press stage started
    pub press_times: Vec<f64>,
    pub points: u32,
    pub hand: Hand,
    pub sequence_id: String,
    pub sequence_execution_index: usize,
    pub run_index: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LogRecord {
    Frame(FrameRecord),
    Sequence(SequenceRecord),
}

/// Destination for log records
pub trait RecordSink {
    fn record(&mut self, record: &LogRecord) -> Result<()>;

    /// Push buffered output to its destination
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory sink
impl RecordSink for Vec<LogRecord> {
    fn record(&mut self, record: &LogRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Sink for sessions run without log files
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardSink;

impl RecordSink for DiscardSink {
    fn record(&mut self, _record: &LogRecord) -> Result<()> {
        Ok(())
    }
}
