//! Keyboard input and a plain-text stimulus row on the controlling terminal.

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{self, ClearType},
};
use srtt_core::{ExperimentError, KeyMap, Position};
use srtt_experiment::{InputContext, InputEvent, RenderContext, TrialProgress};
use srtt_timing::Timer;
use std::io::{self, Stdout, Write, stdout};
use std::time::Duration;
use tracing::warn;

/// Raw mode with a hidden cursor for as long as the guard lives.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        if let Err(e) = execute!(stdout(), cursor::Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), cursor::Show, Print("\r\n"));
        let _ = terminal::disable_raw_mode();
    }
}

fn is_abort(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Translates a key press into an input event; `None` for keys that carry
/// no symbol.
fn classify(key: &KeyEvent, at_ns: u64) -> Option<InputEvent> {
    if is_abort(key) {
        return Some(InputEvent::Abort);
    }
    match key.code {
        KeyCode::Char(symbol) => Some(InputEvent::Response { symbol, at_ns }),
        _ => None,
    }
}

/// Reads key presses, stamping each with the session timer at the moment
/// it is taken off the event queue.
pub struct TerminalInput<T: Timer<Timestamp = u64>> {
    timer: T,
}

impl<T: Timer<Timestamp = u64>> TerminalInput<T> {
    pub fn new(timer: T) -> Self {
        Self { timer }
    }

    fn next_press(&self, timeout: Option<Duration>) -> io::Result<Option<KeyEvent>> {
        let start = self.timer.now();
        loop {
            if let Some(timeout) = timeout {
                let remaining = timeout.saturating_sub(self.timer.elapsed(start));
                if remaining.is_zero() || !event::poll(remaining)? {
                    return Ok(None);
                }
            }
            if let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                return Ok(Some(key));
            }
        }
    }
}

impl<T: Timer<Timestamp = u64>> InputContext for TerminalInput<T> {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, ExperimentError> {
        let start = self.timer.now();
        loop {
            let remaining = timeout.saturating_sub(self.timer.elapsed(start));
            let Some(key) = self.next_press(Some(remaining))? else {
                return Ok(None);
            };
            if let Some(event) = classify(&key, self.timer.now()) {
                return Ok(Some(event));
            }
        }
    }

    /// Space continues; Esc or Ctrl+C ends the session.
    fn wait_to_continue(&mut self) -> Result<bool, ExperimentError> {
        loop {
            let Some(key) = self.next_press(None)? else {
                continue;
            };
            if is_abort(&key) {
                return Ok(false);
            }
            if key.code == KeyCode::Char(' ') {
                return Ok(true);
            }
        }
    }
}

/// Draws one row of boxes, the target filled, with the response key under
/// each box.
pub struct TerminalDisplay {
    out: Stdout,
    keys: KeyMap,
}

impl TerminalDisplay {
    pub fn new(keys: KeyMap) -> Self {
        Self {
            out: stdout(),
            keys,
        }
    }

    /// Replaces the screen contents with `lines`.
    pub fn show(&mut self, lines: &[String]) {
        if let Err(e) = self.draw(lines) {
            warn!(error = %e, "terminal draw failed");
        }
    }

    fn draw(&mut self, lines: &[String]) -> io::Result<()> {
        queue!(
            self.out,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::All)
        )?;
        for line in lines {
            queue!(self.out, Print(line), Print("\r\n"))?;
        }
        self.out.flush()
    }
}

fn stimulus_row(target: Option<Position>, position_count: usize) -> String {
    (0..position_count)
        .map(|i| {
            if target.map(Position::index) == Some(i) {
                "[#]"
            } else {
                "[ ]"
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn key_row(keys: &KeyMap, position_count: usize) -> String {
    (0..position_count)
        .map(|i| {
            let symbol = keys.symbol_for(Position::new(i)).unwrap_or('?');
            format!(" {symbol} ")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl RenderContext for TerminalDisplay {
    fn present(&mut self, target: Position, progress: &TrialProgress) {
        let lines = [
            format!(
                "Block {}/{}   Trial {}/{}",
                progress.block_number,
                progress.total_blocks,
                progress.trial_number,
                progress.trials_per_block
            ),
            String::new(),
            stimulus_row(Some(target), progress.position_count),
            key_row(&self.keys, progress.position_count),
        ];
        self.show(&lines);
    }

    fn clear(&mut self) {
        self.show(&[]);
    }

    fn block_boundary(&mut self, completed_block: usize, total_blocks: usize) {
        self.show(&[
            format!("Block {completed_block} of {total_blocks} complete."),
            String::new(),
            "Take a short break.".to_owned(),
            "Press SPACE to continue or ESC to stop.".to_owned(),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_and_ctrl_c_abort() {
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(classify(&esc, 5), Some(InputEvent::Abort));
        assert_eq!(classify(&ctrl_c, 5), Some(InputEvent::Abort));
    }

    #[test]
    fn characters_become_responses() {
        let key = KeyEvent::new(KeyCode::Char('3'), KeyModifiers::NONE);
        assert_eq!(
            classify(&key, 42),
            Some(InputEvent::Response {
                symbol: '3',
                at_ns: 42
            })
        );
        let arrow = KeyEvent::new(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(classify(&arrow, 42), None);
    }

    #[test]
    fn rows_mark_the_target() {
        assert_eq!(stimulus_row(Some(Position::new(1)), 3), "[ ] [#] [ ]");
        assert_eq!(stimulus_row(None, 2), "[ ] [ ]");
        assert_eq!(key_row(&KeyMap::digits(), 3), " 1   2   3 ");
    }
}
