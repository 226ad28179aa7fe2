//! Keystroke input handling using crossterm
//!
//! Features:
//! - Non-blocking keystroke capture, drained once per frame
//! - Keyboard stand-in for the finger sensor: one key per channel
//! - Ctrl+C / Ctrl+Q / Esc graceful exit, Ctrl+F filter toggle

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use std::io::{stdout, Result as IoResult};
use std::time::Duration;

/// How long a key counts as held after its last press or repeat when the
/// terminal does not report releases (seconds). Longer than the usual
/// auto-repeat delay so a held key does not flicker.
const FALLBACK_HOLD: f64 = 0.55;

/// What a key event means to the session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    ToggleFilter,
    /// Channel key went down (or repeated)
    Press(usize),
    /// Channel key went up
    Release(usize),
}

/// Handles user input from terminal
pub struct InputHandler {
    /// Timeout for the first poll of a frame
    poll_timeout: Duration,
    /// Key for each channel
    key_codes: Vec<char>,
    /// Whether we asked the terminal for release events
    enhanced: bool,
    /// Whether raw mode is ours to undo
    raw: bool,
}

impl InputHandler {
    /// Create new input handler with a frame-sized timeout (16ms)
    pub fn new(key_codes: Vec<char>) -> Self {
        InputHandler {
            poll_timeout: Duration::from_millis(16),
            key_codes,
            enhanced: false,
            raw: false,
        }
    }

    /// Enable raw mode and, where supported, key release reporting
    pub fn enable_raw_mode(&mut self) -> IoResult<()> {
        crossterm::terminal::enable_raw_mode()?;
        self.raw = true;
        if matches!(crossterm::terminal::supports_keyboard_enhancement(), Ok(true)) {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.enhanced = true;
        }
        Ok(())
    }

    /// Disable raw mode and restore terminal
    pub fn disable_raw_mode(&mut self) -> IoResult<()> {
        if self.enhanced {
            self.enhanced = false;
            execute!(stdout(), PopKeyboardEnhancementFlags)?;
        }
        if self.raw {
            self.raw = false;
            crossterm::terminal::disable_raw_mode()?;
        }
        Ok(())
    }

    /// Wait up to one frame for input, then drain everything already queued
    pub fn poll_commands(&self) -> Result<Vec<Command>, Box<dyn std::error::Error>> {
        let mut commands = Vec::new();
        let mut timeout = self.poll_timeout;
        while event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let Some(command) = self.command_for(&key) {
                    commands.push(command);
                }
            }
            timeout = Duration::ZERO;
        }
        Ok(commands)
    }

    /// Translate one key event
    pub fn command_for(&self, key: &KeyEvent) -> Option<Command> {
        if Self::is_exit(key) {
            return Some(Command::Quit);
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('f') if ctrl => Some(Command::ToggleFilter),
            KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                let c = c.to_ascii_lowercase();
                let channel = self.key_codes.iter().position(|&k| k == c)?;
                match key.kind {
                    KeyEventKind::Release => Some(Command::Release(channel)),
                    KeyEventKind::Press | KeyEventKind::Repeat => Some(Command::Press(channel)),
                }
            }
            _ => None,
        }
    }

    /// Check if key event is an exit signal (Ctrl+C, Ctrl+Q or Escape)
    pub fn is_exit(key: &KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                true
            }
            KeyCode::Esc => true,
            _ => false,
        }
    }
}

impl Drop for InputHandler {
    fn drop(&mut self) {
        // Best effort restore on early exit
        let _ = self.disable_raw_mode();
    }
}

/// Turns key presses into per-channel raw angle samples
#[derive(Clone, Debug)]
pub struct KeyboardStandIn {
    /// Time of the last press/repeat per channel, while held
    held_since: Vec<Option<f64>>,
    /// Set once the terminal has reported any release
    sees_releases: bool,
    pressed_angle: f64,
    rest_angle: f64,
}

impl KeyboardStandIn {
    /// A held key reads as 1.1x the press threshold, a free key reads as the rest angle
    pub fn new(channels: usize, press_threshold: f64, rest_angle: f64) -> Self {
        KeyboardStandIn {
            held_since: vec![None; channels],
            sees_releases: false,
            pressed_angle: 1.1 * press_threshold,
            rest_angle,
        }
    }

    pub fn apply(&mut self, command: Command, now: f64) {
        match command {
            Command::Press(ch) => {
                if let Some(slot) = self.held_since.get_mut(ch) {
                    *slot = Some(now);
                }
            }
            Command::Release(ch) => {
                self.sees_releases = true;
                if let Some(slot) = self.held_since.get_mut(ch) {
                    *slot = None;
                }
            }
            Command::Quit | Command::ToggleFilter => {}
        }
    }

    pub fn is_held(&self, ch: usize, now: f64) -> bool {
        match self.held_since.get(ch).copied().flatten() {
            Some(_) if self.sees_releases => true,
            Some(last) => now - last < FALLBACK_HOLD,
            None => false,
        }
    }

    /// One raw sample per channel for this frame
    pub fn samples(&self, now: f64) -> Vec<f64> {
        (0..self.held_since.len())
            .map(|ch| {
                if self.is_held(ch, now) {
                    self.pressed_angle
                } else {
                    self.rest_angle
                }
            })
            .collect()
    }
}
