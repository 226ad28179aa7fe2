//! Trial state machine
//!
//! Drives the protocol one frame at a time:
//!
//! ```text
//! wait -> cue -> press -> feedback -> press ... -> iti -> cue ...
//!                                                     \-> wait (new run) / finished
//! ```
//!
//! The caller owns the clock and the signal path. Every frame it passes the
//! current time, the edges drained from the conditioner, the held levels and the
//! filtered angles; the machine answers with what to draw and what to log.

use super::intent::{CueText, Palette, PresentationIntent, Stage};
use super::ledger::SessionLedger;
use super::records::{FrameRecord, LogRecord, SequenceRecord};
use super::scoring::{Outcome, ScoringEngine};
use super::sequence::{Hand, Sequence, SequenceCatalog};
use crate::error::{Error, Result};
use tracing::{debug, info};

/// Timing and counting parameters of the protocol
#[derive(Clone, Debug, PartialEq)]
pub struct ProtocolConfig {
    /// Seconds the cue is shown
    pub cue_time: f64,
    /// Seconds the reward tier is shown
    pub feedback_time: f64,
    /// Seconds between trials
    pub iti_time: f64,
    /// Seconds between a complete start gesture and the first cue
    pub start_wait_time: f64,
    pub seq_per_trial: usize,
    pub trials_per_run: usize,
    pub num_runs: usize,
    /// Keys per hand
    pub active_keys: usize,
    /// Hand used for the start gesture
    pub start_hand: Hand,
    /// Keys that must have been pressed to start a run
    pub start_keys_required: usize,
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("cue_time", self.cue_time),
            ("feedback_time", self.feedback_time),
            ("iti_time", self.iti_time),
            ("start_wait_time", self.start_wait_time),
        ];
        for (name, value) in durations {
            if !(value >= 0.0) {
                return Err(Error::InvalidConfig(format!("{} must be >= 0", name)));
            }
        }
        let counts = [
            ("seq_per_trial", self.seq_per_trial),
            ("trials_per_run", self.trials_per_run),
            ("num_runs", self.num_runs),
            ("num_active_fingers", self.active_keys),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} must be > 0", name)));
            }
        }
        if self.start_keys_required > self.active_keys {
            return Err(Error::InvalidConfig(format!(
                "start gesture needs {} keys but only {} are active",
                self.start_keys_required, self.active_keys
            )));
        }
        Ok(())
    }
}

/// One frame of input to [`TrialStateMachine::step`]
#[derive(Clone, Copy, Debug)]
pub struct FrameInput<'a> {
    /// Monotonic session time in seconds
    pub now: f64,
    /// Channels with a new rising edge since the previous frame
    pub edges: &'a [usize],
    /// Held state per channel
    pub levels: &'a [bool],
    /// Filtered angle per channel
    pub filtered: &'a [f64],
}

/// Result of one frame
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutput {
    pub intent: PresentationIntent,
    pub records: Vec<LogRecord>,
    /// The last run is over
    pub finished: bool,
}

/// Press bookkeeping for one sequence attempt
#[derive(Clone, Debug, PartialEq)]
pub struct Attempt {
    next_index: usize,
    correct: Vec<bool>,
    press_times: Vec<f64>,
}

impl Attempt {
    fn new(len: usize) -> Self {
        Attempt {
            next_index: 0,
            correct: vec![false; len],
            press_times: vec![0.0; len],
        }
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Match flag per press
    pub fn correct(&self) -> &[bool] {
        &self.correct
    }

    pub fn press_times(&self) -> &[f64] {
        &self.press_times
    }

    pub fn is_complete(&self) -> bool {
        self.next_index >= self.correct.len()
    }

    pub fn all_correct(&self) -> bool {
        self.correct.iter().all(|&c| c)
    }

    /// Last press time minus first press time
    pub fn total_time(&self) -> f64 {
        match (self.press_times.first(), self.press_times.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// The protocol driver
#[derive(Clone, Debug)]
pub struct TrialStateMachine {
    config: ProtocolConfig,
    catalog: SequenceCatalog,
    scoring: ScoringEngine,
    ledger: SessionLedger,
    stage: Stage,
    stage_started: f64,
    last_now: f64,
    sequence: Sequence,
    attempt: Attempt,
    /// Unconsumed edges per key of the active hand
    pending: Vec<bool>,
    key_colors: Vec<Palette>,
    /// Start gesture: keys seen held since the wait stage began
    start_latched: Vec<bool>,
    start_armed_at: Option<f64>,
    last_outcome: Option<Outcome>,
}

impl TrialStateMachine {
    /// Create a machine waiting for the first run's start gesture
    pub fn new(config: ProtocolConfig, catalog: SequenceCatalog) -> Result<Self> {
        config.validate()?;
        let keys = config.active_keys;
        for sequence in catalog.sequences() {
            if let Some(&key) = sequence.keys.iter().find(|&&k| k >= keys) {
                return Err(Error::KeyOutOfRange {
                    id: sequence.id.clone(),
                    key,
                    active: keys,
                });
            }
        }
        let sequence = catalog.for_trial(0).clone();
        let mut machine = TrialStateMachine {
            attempt: Attempt::new(sequence.len()),
            sequence,
            config,
            catalog,
            scoring: ScoringEngine::new(),
            ledger: SessionLedger::new(),
            stage: Stage::Wait,
            stage_started: 0.0,
            last_now: 0.0,
            pending: vec![false; keys],
            key_colors: vec![Palette::Base; keys],
            start_latched: vec![false; keys],
            start_armed_at: None,
            last_outcome: None,
        };
        machine.enter_wait(0.0);
        Ok(machine)
    }

    pub fn with_scoring(mut self, scoring: ScoringEngine) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    pub fn current_sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Hand whose keys are live in the current stage
    pub fn active_hand(&self) -> Option<Hand> {
        match self.stage {
            Stage::Wait => Some(self.config.start_hand),
            Stage::Finished => None,
            _ => Some(self.sequence.hand),
        }
    }

    /// Advance by one frame
    pub fn step(&mut self, input: &FrameInput<'_>) -> StepOutput {
        // a clock that runs backwards counts as no time passing
        let now = input.now.max(self.last_now);
        self.last_now = now;
        let elapsed = now - self.stage_started;

        if let Some(hand) = self.active_hand() {
            for &ch in input.edges {
                if let Some(key) = hand.key_for_channel(ch, self.config.active_keys) {
                    self.pending[key] = true;
                }
            }
        }

        let mut records = Vec::new();
        match self.stage {
            Stage::Wait => self.wait_for_start(now, input.levels),
            Stage::Cue => {
                self.clear_pending();
                if elapsed >= self.config.cue_time {
                    self.enter_press(now);
                }
            }
            Stage::Press => self.collect_press(now, elapsed, input.filtered, &mut records),
            Stage::Feedback => {
                if elapsed >= self.config.feedback_time {
                    self.reset_sequence();
                    if self.ledger.seq_in_trial < self.config.seq_per_trial {
                        self.enter_press(now);
                    } else {
                        self.stage = Stage::Iti;
                        self.stage_started = now;
                    }
                }
            }
            Stage::Iti => {
                if elapsed >= self.config.iti_time {
                    self.end_trial(now);
                }
            }
            Stage::Finished => {}
        }

        StepOutput {
            intent: self.intent(),
            records,
            finished: self.stage == Stage::Finished,
        }
    }

    fn wait_for_start(&mut self, now: f64, levels: &[bool]) {
        self.clear_pending();
        let offset = self.config.start_hand.channel_offset(self.config.active_keys);
        for key in 0..self.config.active_keys {
            if levels.get(key + offset).copied().unwrap_or(false) {
                self.start_latched[key] = true;
                self.key_colors[key] = Palette::Success;
            }
        }

        let latched = self.start_latched.iter().filter(|&&l| l).count();
        if self.start_armed_at.is_none() && latched >= self.config.start_keys_required {
            debug!(run = self.ledger.run, "start gesture complete");
            self.start_armed_at = Some(now);
        }

        if let Some(armed) = self.start_armed_at {
            if now - armed >= self.config.start_wait_time {
                info!(run = self.ledger.run, "run started");
                self.begin_trial(now);
            }
        }
    }

    fn collect_press(
        &mut self,
        now: f64,
        elapsed: f64,
        filtered: &[f64],
        records: &mut Vec<LogRecord>,
    ) {
        records.push(LogRecord::Frame(FrameRecord {
            trial_elapsed_time: elapsed,
            filtered_angles: filtered.to_vec(),
            hand: self.sequence.hand,
            sequence_id: self.sequence.id.clone(),
            sequence_execution_index: self.execution_index(),
            run_index: self.ledger.run,
        }));

        let index = self.attempt.next_index;
        let expected = self.sequence.keys[index];
        self.key_colors[expected] = Palette::Cue;

        // one press per frame, lowest key first; the rest wait for later frames
        let Some(pressed) = self.pending.iter().position(|&p| p) else {
            return;
        };
        self.pending[pressed] = false;

        let correct = pressed == expected;
        self.key_colors[expected] = if correct {
            Palette::Success
        } else {
            Palette::Fail
        };
        self.attempt.correct[index] = correct;
        self.attempt.press_times[index] = elapsed;
        self.attempt.next_index += 1;
        debug!(key = pressed, expected, correct, t = elapsed, "press");

        if self.attempt.is_complete() {
            records.push(self.finish_sequence(now));
        }
    }

    fn finish_sequence(&mut self, now: f64) -> LogRecord {
        let correct = self.attempt.all_correct();
        let total = self.attempt.total_time();
        let outcome = self
            .scoring
            .score(correct, total, self.ledger.history(&self.sequence.id));
        if correct {
            self.ledger.record_time(&self.sequence.id, total);
        }
        self.ledger.record_sequence(correct, outcome.points);

        info!(
            sequence = %self.sequence.id,
            tier = outcome.tier.as_str(),
            points = outcome.points,
            time = total,
            score = self.ledger.score,
            "sequence complete"
        );

        let record = LogRecord::Sequence(SequenceRecord {
            sequence_total_time: total,
            press_times: self.attempt.press_times.clone(),
            points: outcome.points,
            hand: self.sequence.hand,
            sequence_id: self.sequence.id.clone(),
            sequence_execution_index: self.execution_index(),
            run_index: self.ledger.run,
        });

        self.last_outcome = Some(outcome);
        self.ledger.seq_in_trial += 1;
        self.stage = Stage::Feedback;
        self.stage_started = now;
        record
    }

    fn end_trial(&mut self, now: f64) {
        let new_run = self.ledger.advance_trial(self.config.trials_per_run);
        if !new_run {
            self.begin_trial(now);
        } else if self.ledger.run >= self.config.num_runs {
            info!(score = self.ledger.score, "all runs complete");
            self.stage = Stage::Finished;
            self.stage_started = now;
        } else {
            info!(run = self.ledger.run, score = self.ledger.score, "run complete");
            self.enter_wait(now);
        }
    }

    fn begin_trial(&mut self, now: f64) {
        self.sequence = self.catalog.for_trial(self.ledger.trial).clone();
        self.ledger.seq_in_trial = 0;
        self.reset_sequence();
        self.clear_pending();
        self.stage = Stage::Cue;
        self.stage_started = now;
        debug!(trial = self.ledger.trial, sequence = %self.sequence.id, "cue");
    }

    fn enter_press(&mut self, now: f64) {
        self.clear_pending();
        self.stage = Stage::Press;
        self.stage_started = now;
    }

    fn enter_wait(&mut self, now: f64) {
        self.start_latched.fill(false);
        self.start_armed_at = None;
        self.key_colors.fill(Palette::Cue);
        self.clear_pending();
        self.stage = Stage::Wait;
        self.stage_started = now;
    }

    fn reset_sequence(&mut self) {
        self.key_colors.fill(Palette::Base);
        self.attempt = Attempt::new(self.sequence.len());
    }

    fn clear_pending(&mut self) {
        self.pending.fill(false);
    }

    fn execution_index(&self) -> usize {
        self.ledger
            .execution_index(self.config.seq_per_trial, self.config.trials_per_run)
    }

    fn intent(&self) -> PresentationIntent {
        let score_message = Some(format!("Total score: {}", self.ledger.score));
        let (cue_text, cue_color, run_message, score_message) = match self.stage {
            Stage::Wait => (
                CueText::PressAll,
                Palette::Idle,
                Some(format!(
                    "Run {} of {}",
                    self.ledger.run + 1,
                    self.config.num_runs
                )),
                score_message.filter(|_| self.ledger.run > 0),
            ),
            Stage::Cue => (
                CueText::Sequence(self.sequence.cue_text()),
                Palette::Cue,
                None,
                None,
            ),
            Stage::Feedback => match self.last_outcome {
                Some(outcome) => {
                    let color = if outcome.points > 0 {
                        Palette::Success
                    } else {
                        Palette::Fail
                    };
                    (CueText::Feedback(outcome.tier), color, None, None)
                }
                None => (CueText::Blank, Palette::Idle, None, None),
            },
            Stage::Press | Stage::Iti => (CueText::Blank, Palette::Idle, None, None),
            Stage::Finished => (
                CueText::Blank,
                Palette::Idle,
                Some("All done!".to_string()),
                score_message,
            ),
        };

        PresentationIntent {
            stage: self.stage,
            active_hand: self.active_hand(),
            cue_text,
            cue_color,
            key_colors: self.key_colors.clone(),
            run_message,
            score_message,
        }
    }
}
