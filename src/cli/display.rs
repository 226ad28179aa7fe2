//! Terminal display and UI rendering
//!
//! Features:
//! - Hand indicator and cue box driven by the presentation intent
//! - One bar per active key, length following the filtered finger angle
//! - Run/score messages and the closing summary

use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use finger_seq_trainer::session::{Hand, Palette, PresentationIntent, SessionSummary};
use std::io::{stdout, Write};

/// Width of a fully pressed key bar (characters)
const BAR_WIDTH: usize = 30;

/// Terminal color for a palette role
pub fn palette_color(palette: Palette) -> Color {
    match palette {
        Palette::Base => Color::DarkGrey,
        Palette::Cue => Color::Cyan,
        Palette::Idle => Color::Grey,
        Palette::Success => Color::Green,
        Palette::Fail => Color::Red,
    }
}

/// Bar for a key position in `[0, 1]`
pub fn key_bar(position: f64) -> String {
    let filled = (position.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "·".repeat(BAR_WIDTH - filled))
}

/// Terminal display manager
pub struct Display {
    /// Whether we're using alternate screen
    use_alternate_screen: bool,
    /// Cleared once the terminal has been restored
    active: bool,
}

impl Display {
    /// Create display without alternate screen (simpler mode)
    pub fn simple() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Display {
            use_alternate_screen: false,
            active: true,
        })
    }

    /// Create display on the alternate screen with a hidden cursor
    pub fn fullscreen() -> Result<Self, Box<dyn std::error::Error>> {
        execute!(stdout(), EnterAlternateScreen, cursor::Hide)?;
        Ok(Display {
            use_alternate_screen: true,
            active: true,
        })
    }

    /// Clear screen
    pub fn clear(&self) -> Result<(), Box<dyn std::error::Error>> {
        let mut stdout = stdout();
        execute!(
            stdout,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        Ok(())
    }

    /// Draw one frame. `positions` holds one value in `[0, 1]` per active key.
    pub fn render(
        &self,
        intent: &PresentationIntent,
        positions: &[f64],
        filtering: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut stdout = stdout();
        queue!(stdout, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;

        queue!(
            stdout,
            SetForegroundColor(Color::Magenta),
            Print("Finger Sequence Trainer"),
            ResetColor,
            Print(format!(
                "  |  stage: {}  |  filter: {}",
                intent.stage.as_str(),
                if filtering { "on" } else { "off" }
            )),
        )?;

        // Hand indicator
        queue!(stdout, cursor::MoveTo(0, 2))?;
        for hand in [Hand::Left, Hand::Right] {
            let color = if intent.active_hand == Some(hand) {
                Color::White
            } else {
                Color::DarkGrey
            };
            queue!(
                stdout,
                SetForegroundColor(color),
                Print(format!("{:^10}", hand.as_str().to_uppercase())),
                ResetColor
            )?;
        }

        // Cue box
        let cue_color = palette_color(intent.cue_color);
        queue!(
            stdout,
            cursor::MoveTo(0, 4),
            SetForegroundColor(cue_color),
            Print(format!("[ {:^16} ]", intent.cue_text.text())),
            ResetColor
        )?;

        // Key bars
        for (key, color) in intent.key_colors.iter().enumerate() {
            let position = positions.get(key).copied().unwrap_or(0.0);
            queue!(
                stdout,
                cursor::MoveTo(0, 6 + key as u16),
                SetForegroundColor(palette_color(*color)),
                Print(format!("{} ", key + 1)),
                Print(key_bar(position)),
                ResetColor
            )?;
        }

        let message_row = 7 + intent.key_colors.len() as u16;
        if let Some(run) = &intent.run_message {
            queue!(
                stdout,
                cursor::MoveTo(0, message_row),
                SetForegroundColor(Color::Cyan),
                Print(run),
                ResetColor
            )?;
        }
        if let Some(score) = &intent.score_message {
            queue!(
                stdout,
                cursor::MoveTo(0, message_row + 1),
                SetForegroundColor(Color::Green),
                Print(score),
                ResetColor
            )?;
        }

        queue!(
            stdout,
            cursor::MoveTo(0, message_row + 3),
            SetForegroundColor(Color::DarkGrey),
            Print("Hold your keys to press  |  Ctrl+F filter  |  Ctrl+Q to exit"),
            ResetColor
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print the closing summary (after the terminal is restored)
    pub fn show_summary(&self, summary: &SessionSummary) -> Result<(), Box<dyn std::error::Error>> {
        let mut stdout = stdout();
        execute!(
            stdout,
            SetForegroundColor(Color::Blue),
            Print("─".repeat(50)),
            Print("\n"),
            ResetColor,
            Print(format!(
                "Score: {}  |  Sequences: {}  |  Correct: {:.0}%\n",
                summary.score,
                summary.sequences_done,
                summary.accuracy * 100.0
            )),
        )?;
        for (id, best) in &summary.best_times {
            execute!(stdout, Print(format!("  best {}: {:.3}s\n", id, best)))?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Reset terminal state and cleanup
    pub fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        let mut stdout = stdout();

        if self.use_alternate_screen {
            execute!(stdout, LeaveAlternateScreen, cursor::Show,)?;
        }

        terminal::disable_raw_mode()?;
        Ok(())
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        // Best effort cleanup
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_runs_once() {
        let mut display = Display::simple().unwrap();
        display.shutdown().unwrap();
        assert!(!display.active);
        display.shutdown().unwrap();
        assert!(!display.active);
    }

    #[test]
    fn test_key_bar_length() {
        assert_eq!(key_bar(0.0).chars().filter(|&c| c == '█').count(), 0);
        assert_eq!(key_bar(0.5).chars().filter(|&c| c == '█').count(), 15);
        assert_eq!(key_bar(2.0).chars().count(), BAR_WIDTH);
    }

    #[test]
    fn test_palette_colors_distinct_for_feedback() {
        assert_ne!(palette_color(Palette::Success), palette_color(Palette::Fail));
        assert_eq!(palette_color(Palette::Cue), Color::Cyan);
    }
}
