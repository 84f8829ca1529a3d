//! Error taxonomy shared by the sequencing engine and its collaborators.

use thiserror::Error;

/// Rejected session parameters. Raised before a session starts and fatal to
/// its creation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("position count must be at least 1")]
    NoPositions,

    #[error("block count must be at least 1")]
    NoBlocks,

    #[error("trials per block must be at least 1")]
    NoTrials,

    #[error("structured pattern length must be at least 1")]
    EmptyPattern,

    #[error("timeout must be a positive number of milliseconds, got {0}")]
    InvalidTimeout(f64),

    #[error("give-up policy must allow at least one timeout")]
    ZeroTimeoutCap,

    #[error("key map is empty")]
    EmptyKeyMap,

    #[error("key map symbol '{0}' is listed more than once")]
    DuplicateKey(char),

    #[error("key map has {keys} symbols but {positions} positions are configured")]
    KeyMapTooSmall { keys: usize, positions: usize },

    #[error("participant id must not be blank")]
    BlankParticipant,
}

/// A trial record that does not fit the log schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("block number is 1-based, got 0")]
    ZeroBlock,

    #[error("trial number is 1-based, got 0")]
    ZeroTrial,

    #[error("attempt number is 1-based, got 0")]
    ZeroAttempt,

    #[error("reaction time {value} ms is outside [0, {cap}] ms")]
    ReactionTimeOutOfRange { value: f64, cap: f64 },
}

/// Anything that can stop a running session.
#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("malformed trial record: {0}")]
    Record(#[from] RecordError),

    /// Participant or operator cancelled. Records captured so far stay valid.
    #[error("session aborted")]
    Aborted,

    /// A session's log covers exactly one run.
    #[error("session has already been run")]
    AlreadyRun,

    #[error("input source failed: {0}")]
    Input(#[from] std::io::Error),
}

impl ExperimentError {
    pub fn is_abort(&self) -> bool {
        matches!(self, ExperimentError::Aborted)
    }
}
