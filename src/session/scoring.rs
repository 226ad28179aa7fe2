//! Reward tiers relative to a sequence's own completion history
//!
//! A fully correct attempt earns the "success" tier, or the "fast" tier when it
//! beats the median of that sequence's earlier correct attempts. Any wrong press
//! earns nothing.

use serde::{Deserialize, Serialize};

/// Feedback tier for one completed sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Correct and faster than the running median
    Fast,
    /// Correct
    Success,
    /// At least one wrong press
    Fail,
}

impl Tier {
    /// Feedback label shown to the participant
    pub fn label(self) -> &'static str {
        match self {
            Tier::Fast => "+3",
            Tier::Success => "+1",
            Tier::Fail => "+0",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Fast => "fast",
            Tier::Success => "success",
            Tier::Fail => "fail",
        }
    }
}

/// Tier plus the points it is worth
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub tier: Tier,
    pub points: u32,
}

/// Points per tier
#[derive(Clone, Debug, PartialEq)]
pub struct ScoringEngine {
    pub fast_points: u32,
    pub success_points: u32,
    pub fail_points: u32,
}

impl ScoringEngine {
    pub fn new() -> Self {
        ScoringEngine {
            fast_points: 3,
            success_points: 1,
            fail_points: 0,
        }
    }

    /// Score one attempt. `history` must not contain this attempt yet.
    pub fn score(&self, correct: bool, total_time: f64, history: &[f64]) -> Outcome {
        if !correct {
            return self.outcome(Tier::Fail);
        }
        match median(history) {
            Some(m) if total_time < m => self.outcome(Tier::Fast),
            _ => self.outcome(Tier::Success),
        }
    }

    fn outcome(&self, tier: Tier) -> Outcome {
        let points = match tier {
            Tier::Fast => self.fast_points,
            Tier::Success => self.success_points,
            Tier::Fail => self.fail_points,
        };
        Outcome { tier, points }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Median of `values`; mean of the middle pair for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[1.0, 1.2, 0.8]), Some(1.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_median_tier_boundary() {
        let engine = ScoringEngine::new();
        let history = [1.0, 1.2, 0.8];

        let quick = engine.score(true, 0.9, &history);
        assert_eq!(quick.tier, Tier::Fast);
        assert_eq!(quick.points, 3);

        let slow = engine.score(true, 1.1, &history);
        assert_eq!(slow.tier, Tier::Success);
        assert_eq!(slow.points, 1);

        // equal to the median is not faster than it
        assert_eq!(engine.score(true, 1.0, &history).tier, Tier::Success);
    }

    #[test]
    fn test_first_attempt_is_success() {
        let outcome = ScoringEngine::new().score(true, 0.01, &[]);
        assert_eq!(outcome, Outcome { tier: Tier::Success, points: 1 });
    }

    #[test]
    fn test_incorrect_attempt_fails() {
        let outcome = ScoringEngine::new().score(false, 0.1, &[5.0, 6.0]);
        assert_eq!(outcome, Outcome { tier: Tier::Fail, points: 0 });
    }

    #[test]
    fn test_labels() {
        assert_eq!(Tier::Fast.label(), "+3");
        assert_eq!(Tier::Success.label(), "+1");
        assert_eq!(Tier::Fail.label(), "+0");
        assert_eq!(Tier::Fail.as_str(), "fail");
    }
}
