use crate::block::BlockType;
use crate::error::RecordError;
use crate::position::Position;
use chrono::{DateTime, Local};
use serde::Serialize;

/// Trial state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    /// Stimulus is on screen and the response timer is running.
    AwaitingResponse,
    /// A mapped response arrived and has been recorded.
    Scored { correct: bool },
    /// The trial is over; no more records will be emitted for it.
    Resolved,
}

/// Identifies the trial an attempt belongs to.
#[derive(Debug, Clone, Copy)]
pub struct TrialKey<'a> {
    pub participant_id: &'a str,
    pub block_number: usize,
    pub block_type: BlockType,
    pub trial_number: usize,
    pub position: Position,
}

/// One scored response (or timeout) within a trial.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub number: usize,
    pub reaction_time_ms: f64,
    pub correct: bool,
    pub timestamp: DateTime<Local>,
}

impl Attempt {
    /// Stamped with the current wall-clock time.
    pub fn new(number: usize, reaction_time_ms: f64, correct: bool) -> Self {
        Self {
            number,
            reaction_time_ms,
            correct,
            timestamp: Local::now(),
        }
    }
}

/// Recorded result per attempt. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    participant_id: String,
    block_number: usize,
    block_type: BlockType,
    trial_number: usize,
    position: Position,
    reaction_time_ms: f64,
    correct: bool,
    attempt_number: usize,
    timestamp: DateTime<Local>,
}

impl TrialRecord {
    /// Validates the attempt against the log schema. `rt_cap_ms` is the
    /// response window; latencies are stored clamped to it.
    pub fn new(key: &TrialKey<'_>, attempt: Attempt, rt_cap_ms: f64) -> Result<Self, RecordError> {
        if key.block_number == 0 {
            return Err(RecordError::ZeroBlock);
        }
        if key.trial_number == 0 {
            return Err(RecordError::ZeroTrial);
        }
        if attempt.number == 0 {
            return Err(RecordError::ZeroAttempt);
        }
        let rt = attempt.reaction_time_ms;
        if !rt.is_finite() || rt < 0.0 || rt > rt_cap_ms {
            return Err(RecordError::ReactionTimeOutOfRange {
                value: rt,
                cap: rt_cap_ms,
            });
        }

        Ok(Self {
            participant_id: key.participant_id.to_owned(),
            block_number: key.block_number,
            block_type: key.block_type,
            trial_number: key.trial_number,
            position: key.position,
            reaction_time_ms: rt,
            correct: attempt.correct,
            attempt_number: attempt.number,
            timestamp: attempt.timestamp,
        })
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn block_number(&self) -> usize {
        self.block_number
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn trial_number(&self) -> usize {
        self.trial_number
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn reaction_time_ms(&self) -> f64 {
        self.reaction_time_ms
    }

    pub fn correct(&self) -> bool {
        self.correct
    }

    pub fn attempt_number(&self) -> usize {
        self.attempt_number
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}
