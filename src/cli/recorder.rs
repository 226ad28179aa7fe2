//! CSV recording of frame and sequence records
//!
//! Writes two files per subject:
//! - `frame.csv`: one row per press-stage frame with every channel's filtered angle
//! - `trial.csv`: one row per completed sequence with its press times and points

use finger_seq_trainer::error::{Error, Result};
use finger_seq_trainer::session::{FrameRecord, LogRecord, RecordSink, SequenceRecord};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// CSV writer for both record streams
pub struct Recorder<W: Write> {
    frames: W,
    trials: W,
    channels: usize,
    presses: usize,
    finger_round: usize,
    time_round: usize,
}

impl Recorder<BufWriter<File>> {
    /// Create `<log_dir>/<subject>/{frame,trial}.csv`.
    ///
    /// Refuses to reuse an existing directory unless the subject is `demo`.
    pub fn create(
        log_dir: &Path,
        subject: &str,
        channels: usize,
        presses: usize,
        finger_round: usize,
        time_round: usize,
    ) -> Result<Self> {
        let subject_dir = log_dir.join(subject);
        if subject != "demo" && subject_dir.exists() {
            return Err(Error::SubjectExists(subject_dir.display().to_string()));
        }
        fs::create_dir_all(&subject_dir)?;

        let frames = BufWriter::new(File::create(subject_dir.join("frame.csv"))?);
        let trials = BufWriter::new(File::create(subject_dir.join("trial.csv"))?);
        Recorder::new(frames, trials, channels, presses, finger_round, time_round)
    }
}

impl<W: Write> Recorder<W> {
    /// Wrap two writers and emit both headers. `presses` is the longest sequence.
    pub fn new(
        frames: W,
        trials: W,
        channels: usize,
        presses: usize,
        finger_round: usize,
        time_round: usize,
    ) -> Result<Self> {
        let mut recorder = Recorder {
            frames,
            trials,
            channels,
            presses,
            finger_round,
            time_round,
        };
        recorder.write_headers()?;
        Ok(recorder)
    }

    fn write_headers(&mut self) -> Result<()> {
        let mut frame_header = String::from("trial_time,");
        for ch in 0..self.channels {
            frame_header.push_str(&format!("f_{},", ch));
        }
        frame_header.push_str("hand,seq_id,trial,run\n");
        self.frames.write_all(frame_header.as_bytes())?;

        let mut trial_header = String::from("move_time,");
        for press in 0..self.presses {
            trial_header.push_str(&format!("p_{},", press));
        }
        trial_header.push_str("score,hand,seq_id,trial,run\n");
        self.trials.write_all(trial_header.as_bytes())?;
        Ok(())
    }

    fn write_frame(&mut self, frame: &FrameRecord) -> Result<()> {
        let mut row = format!("{:.*},", self.time_round, frame.trial_elapsed_time);
        for ch in 0..self.channels {
            match frame.filtered_angles.get(ch) {
                Some(angle) => row.push_str(&format!("{:.*},", self.finger_round, angle)),
                None => row.push(','),
            }
        }
        row.push_str(&format!(
            "{},{},{},{}\n",
            frame.hand, frame.sequence_id, frame.sequence_execution_index, frame.run_index
        ));
        self.frames.write_all(row.as_bytes())?;
        Ok(())
    }

    fn write_sequence(&mut self, seq: &SequenceRecord) -> Result<()> {
        let mut row = format!("{:.*},", self.time_round, seq.sequence_total_time);
        for press in 0..self.presses {
            match seq.press_times.get(press) {
                Some(t) => row.push_str(&format!("{:.*},", self.time_round, t)),
                None => row.push(','),
            }
        }
        row.push_str(&format!(
            "{},{},{},{},{}\n",
            seq.points, seq.hand, seq.sequence_id, seq.sequence_execution_index, seq.run_index
        ));
        self.trials.write_all(row.as_bytes())?;
        Ok(())
    }

    /// Hand back the writers (used by tests to inspect output)
    pub fn into_inner(self) -> (W, W) {
        (self.frames, self.trials)
    }
}

impl<W: Write> RecordSink for Recorder<W> {
    fn record(&mut self, record: &LogRecord) -> Result<()> {
        match record {
            LogRecord::Frame(frame) => self.write_frame(frame),
            LogRecord::Sequence(seq) => self.write_sequence(seq),
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.frames.flush()?;
        self.trials.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finger_seq_trainer::session::Hand;

    fn recorder() -> Recorder<Vec<u8>> {
        Recorder::new(Vec::new(), Vec::new(), 3, 4, 2, 3).unwrap()
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_headers() {
        let (frames, trials) = recorder().into_inner();
        assert_eq!(text(frames), "trial_time,f_0,f_1,f_2,hand,seq_id,trial,run\n");
        assert_eq!(
            text(trials),
            "move_time,p_0,p_1,p_2,p_3,score,hand,seq_id,trial,run\n"
        );
    }

    #[test]
    fn test_frame_row() {
        let mut rec = recorder();
        rec.record(&LogRecord::Frame(FrameRecord {
            trial_elapsed_time: 0.123456,
            filtered_angles: vec![1.0, 22.456, -3.0],
            hand: Hand::Right,
            sequence_id: "B".to_string(),
            sequence_execution_index: 7,
            run_index: 1,
        }))
        .unwrap();
        let (frames, _) = rec.into_inner();
        let out = text(frames);
        assert_eq!(out.lines().nth(1), Some("0.123,1.00,22.46,-3.00,right,B,7,1"));
    }

    #[test]
    fn test_short_sequence_pads_press_columns() {
        let mut rec = recorder();
        rec.record(&LogRecord::Sequence(SequenceRecord {
            sequence_total_time: 0.5,
            press_times: vec![0.25, 0.5, 0.75],
            points: 3,
            hand: Hand::Left,
            sequence_id: "A".to_string(),
            sequence_execution_index: 2,
            run_index: 0,
        }))
        .unwrap();
        let (_, trials) = rec.into_inner();
        let out = text(trials);
        assert_eq!(
            out.lines().nth(1),
            Some("0.500,0.250,0.500,0.750,,3,left,A,2,0")
        );
    }
}
