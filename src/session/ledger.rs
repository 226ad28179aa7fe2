//! Session ledger
//!
//! Maintains:
//! - Run, trial and sequence-in-trial counters
//! - Completion-time history per sequence id (append-only)
//! - Cumulative score

use rustc_hash::FxHashMap;

/// Running counters and history for one session
#[derive(Clone, Debug, Default)]
pub struct SessionLedger {
    /// Current run (0-based)
    pub run: usize,
    /// Current trial within the run (0-based)
    pub trial: usize,
    /// Completed sequences within the current trial
    pub seq_in_trial: usize,
    /// Total points so far
    pub score: u32,
    /// Sequences completed in the session, correct or not
    pub sequences_done: u32,
    /// Sequences completed without a wrong press
    pub sequences_correct: u32,
    /// Sequence id -> completion times of correct attempts, oldest first
    history: FxHashMap<String, Vec<f64>>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completion times recorded for `id` (empty if none yet)
    pub fn history(&self, id: &str) -> &[f64] {
        self.history.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append a completion time for `id`
    pub fn record_time(&mut self, id: &str, time: f64) {
        self.history.entry(id.to_string()).or_default().push(time);
    }

    /// Count a finished sequence and bank its points
    pub fn record_sequence(&mut self, correct: bool, points: u32) {
        self.sequences_done += 1;
        if correct {
            self.sequences_correct += 1;
        }
        self.score += points;
    }

    /// Running index of the current sequence across the whole session
    pub fn execution_index(&self, seq_per_trial: usize, trials_per_run: usize) -> usize {
        self.seq_in_trial + self.trial * seq_per_trial + self.run * seq_per_trial * trials_per_run
    }

    /// Move to the next trial. Returns true when that rolled over into a new run.
    pub fn advance_trial(&mut self, trials_per_run: usize) -> bool {
        self.trial += 1;
        self.seq_in_trial = 0;
        if self.trial >= trials_per_run {
            self.trial = 0;
            self.run += 1;
            true
        } else {
            false
        }
    }

    /// Fastest correct completion of `id`
    pub fn best_time(&self, id: &str) -> Option<f64> {
        self.history(id).iter().copied().reduce(f64::min)
    }

    /// Share of completed sequences without mistakes (1.0 before any)
    pub fn accuracy(&self) -> f32 {
        if self.sequences_done == 0 {
            1.0
        } else {
            self.sequences_correct as f32 / self.sequences_done as f32
        }
    }

    /// Per-sequence best times, sorted by id
    pub fn summary(&self) -> SessionSummary {
        let mut best_times: Vec<(String, f64)> = self
            .history
            .iter()
            .filter_map(|(id, times)| {
                times
                    .iter()
                    .copied()
                    .reduce(f64::min)
                    .map(|best| (id.clone(), best))
            })
            .collect();
        best_times.sort_by(|a, b| a.0.cmp(&b.0));

        SessionSummary {
            score: self.score,
            sequences_done: self.sequences_done,
            accuracy: self.accuracy(),
            best_times,
        }
    }
}

/// End-of-session numbers for the closing screen
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub score: u32,
    pub sequences_done: u32,
    pub accuracy: f32,
    pub best_times: Vec<(String, f64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_append_only() {
        let mut ledger = SessionLedger::new();
        assert!(ledger.history("a").is_empty());
        ledger.record_time("a", 1.5);
        ledger.record_time("a", 1.2);
        ledger.record_time("b", 2.0);
        assert_eq!(ledger.history("a"), &[1.5, 1.2]);
        assert_eq!(ledger.best_time("a"), Some(1.2));
        assert_eq!(ledger.best_time("c"), None);
    }

    #[test]
    fn test_execution_index() {
        let mut ledger = SessionLedger::new();
        ledger.run = 1;
        ledger.trial = 2;
        ledger.seq_in_trial = 3;
        // 3 + 2*4 + 1*4*5
        assert_eq!(ledger.execution_index(4, 5), 31);
    }

    #[test]
    fn test_advance_trial_rolls_over_runs() {
        let mut ledger = SessionLedger::new();
        ledger.seq_in_trial = 2;
        assert!(!ledger.advance_trial(2));
        assert_eq!((ledger.run, ledger.trial, ledger.seq_in_trial), (0, 1, 0));
        assert!(ledger.advance_trial(2));
        assert_eq!((ledger.run, ledger.trial), (1, 0));
    }

    #[test]
    fn test_summary() {
        let mut ledger = SessionLedger::new();
        ledger.record_sequence(true, 1);
        ledger.record_sequence(false, 0);
        ledger.record_sequence(true, 3);
        ledger.record_time("b", 0.9);
        ledger.record_time("a", 1.1);
        ledger.record_time("a", 0.7);

        let summary = ledger.summary();
        assert_eq!(summary.score, 4);
        assert_eq!(summary.sequences_done, 3);
        assert!((summary.accuracy - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(
            summary.best_times,
            vec![("a".to_string(), 0.7), ("b".to_string(), 0.9)]
        );
    }
}
