//! Seams to the outside world: whoever delivers key presses and whoever
//! shows stimuli. Both are built once per session and passed down by
//! `&mut` to the block and trial loops.

use srtt_core::{BlockType, ExperimentError, Position};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A key press, stamped with the session timer's reading on arrival.
    Response { symbol: char, at_ns: u64 },
    /// Participant or operator wants out.
    Abort,
}

pub trait InputContext {
    /// Blocks until an event arrives or `timeout` elapses (`Ok(None)`).
    fn next_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, ExperimentError>;

    /// Break between blocks. `Ok(false)` ends the session early.
    fn wait_to_continue(&mut self) -> Result<bool, ExperimentError> {
        Ok(true)
    }
}

/// Where a trial sits within the session, for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialProgress {
    pub block_number: usize,
    pub total_blocks: usize,
    pub block_type: BlockType,
    pub trial_number: usize,
    pub trials_per_block: usize,
    pub position_count: usize,
}

/// Observes the session; nothing it does feeds back into scoring.
pub trait RenderContext {
    fn present(&mut self, target: Position, progress: &TrialProgress);
    fn clear(&mut self);
    fn block_boundary(&mut self, completed_block: usize, total_blocks: usize);
}

/// Renders nothing. Useful for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRender;

impl RenderContext for NullRender {
    fn present(&mut self, _target: Position, _progress: &TrialProgress) {}
    fn clear(&mut self) {}
    fn block_boundary(&mut self, _completed_block: usize, _total_blocks: usize) {}
}
