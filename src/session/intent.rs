//! Presentation intents: what the display layer should show this frame

use super::scoring::Tier;
use super::sequence::Hand;

/// Stage of the protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Waiting for the start gesture before a run
    Wait,
    /// Showing the upcoming sequence
    Cue,
    /// Collecting presses
    Press,
    /// Showing the reward tier
    Feedback,
    /// Inter-trial interval
    Iti,
    /// All runs done
    Finished,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Wait => "wait",
            Stage::Cue => "cue",
            Stage::Press => "press",
            Stage::Feedback => "feedback",
            Stage::Iti => "iti",
            Stage::Finished => "finished",
        }
    }
}

/// Color roles; the display layer owns the actual colors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Palette {
    /// Resting key color
    Base,
    /// Key or outline asking for attention
    Cue,
    /// Outline with nothing to show
    Idle,
    Success,
    Fail,
}

/// Text in the cue box
#[derive(Clone, Debug, PartialEq)]
pub enum CueText {
    Blank,
    /// Start gesture prompt
    PressAll,
    /// 1-based key numbers of the upcoming sequence
    Sequence(String),
    Feedback(Tier),
}

impl CueText {
    pub fn text(&self) -> &str {
        match self {
            CueText::Blank => "",
            CueText::PressAll => "Press All",
            CueText::Sequence(s) => s,
            CueText::Feedback(tier) => tier.label(),
        }
    }
}

/// Everything the display needs besides key positions
#[derive(Clone, Debug, PartialEq)]
pub struct PresentationIntent {
    pub stage: Stage,
    /// Highlighted hand, if any
    pub active_hand: Option<Hand>,
    pub cue_text: CueText,
    /// Color of the cue outline and text
    pub cue_color: Palette,
    /// One entry per active key
    pub key_colors: Vec<Palette>,
    pub run_message: Option<String>,
    pub score_message: Option<String>,
}
