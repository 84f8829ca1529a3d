//! Scripted collaborators for replaying a keystroke log against a
//! [`ManualTimer`], and for capturing what would have been shown.

use crate::context::{InputContext, InputEvent, RenderContext, TrialProgress};
use srtt_core::{ExperimentError, Position};
use srtt_timing::{ManualTimer, Timer};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayStep {
    /// Press `symbol` this long after the previous event or re-presentation.
    Key { after_ms: u64, symbol: char },
    /// Let the whole response window pass.
    Silence,
    Abort,
}

impl ReplayStep {
    pub fn key(after_ms: u64, symbol: char) -> Self {
        ReplayStep::Key { after_ms, symbol }
    }
}

/// Feeds scripted steps, moving the shared clock as it goes. An exhausted
/// script reads as an abort.
#[derive(Debug)]
pub struct ReplayInput {
    timer: ManualTimer,
    steps: VecDeque<ReplayStep>,
}

impl ReplayInput {
    pub fn new(timer: ManualTimer, steps: impl IntoIterator<Item = ReplayStep>) -> Self {
        Self {
            timer,
            steps: steps.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl InputContext for ReplayInput {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, ExperimentError> {
        match self.steps.pop_front() {
            None | Some(ReplayStep::Abort) => Ok(Some(InputEvent::Abort)),
            Some(ReplayStep::Silence) => {
                self.timer.advance(timeout);
                Ok(None)
            }
            Some(ReplayStep::Key { after_ms, symbol }) => {
                let after = Duration::from_millis(after_ms);
                if after > timeout {
                    self.timer.advance(timeout);
                    let left = after - timeout;
                    self.steps.push_front(ReplayStep::Key {
                        after_ms: left.as_millis() as u64,
                        symbol,
                    });
                    return Ok(None);
                }
                self.timer.advance(after);
                Ok(Some(InputEvent::Response {
                    symbol,
                    at_ns: self.timer.now(),
                }))
            }
        }
    }

    fn wait_to_continue(&mut self) -> Result<bool, ExperimentError> {
        if self.steps.front() == Some(&ReplayStep::Abort) {
            self.steps.pop_front();
            return Ok(false);
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderCall {
    Present(Position),
    Clear,
    BlockBoundary { completed: usize, total: usize },
}

/// Remembers every render call in order.
#[derive(Debug, Default)]
pub struct RenderLog {
    pub calls: Vec<RenderCall>,
}

impl RenderContext for RenderLog {
    fn present(&mut self, target: Position, _progress: &TrialProgress) {
        self.calls.push(RenderCall::Present(target));
    }

    fn clear(&mut self) {
        self.calls.push(RenderCall::Clear);
    }

    fn block_boundary(&mut self, completed_block: usize, total_blocks: usize) {
        self.calls.push(RenderCall::BlockBoundary {
            completed: completed_block,
            total: total_blocks,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_key_first_times_out() {
        let timer = ManualTimer::new();
        let mut input = ReplayInput::new(timer.clone(), [ReplayStep::key(7000, '1')]);
        let window = Duration::from_secs(5);
        assert_eq!(input.next_event(window).unwrap(), None);
        assert_eq!(timer.now(), 5_000_000_000);
        let event = input.next_event(window).unwrap();
        assert_eq!(
            event,
            Some(InputEvent::Response {
                symbol: '1',
                at_ns: 7_000_000_000
            })
        );
    }

    #[test]
    fn exhausted_script_aborts() {
        let mut input = ReplayInput::new(ManualTimer::new(), []);
        assert_eq!(
            input.next_event(Duration::from_secs(1)).unwrap(),
            Some(InputEvent::Abort)
        );
    }

    #[test]
    fn abort_at_break_declines_to_continue() {
        let mut input = ReplayInput::new(ManualTimer::new(), [ReplayStep::Abort]);
        assert!(!input.wait_to_continue().unwrap());
        assert_eq!(input.remaining(), 0);
        assert!(input.wait_to_continue().unwrap());
    }
}
