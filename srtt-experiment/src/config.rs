use serde::{Deserialize, Serialize};
use srtt_core::{ConfigError, KeyMap};
use std::time::Duration;

/// Timeouts tolerated before a trial is abandoned, when give-up is enabled.
pub const DEFAULT_GIVE_UP_AFTER: u32 = 5;

/// What happens after a trial's response window expires without an answer.
/// Every timeout is recorded as an incorrect attempt either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Re-present the same target until it is answered correctly.
    #[default]
    Unbounded,
    /// Move on once this many timeouts have accumulated in the trial.
    GiveUpAfter(u32),
}

impl TimeoutPolicy {
    pub fn bounded() -> Self {
        TimeoutPolicy::GiveUpAfter(DEFAULT_GIVE_UP_AFTER)
    }

    pub fn gives_up_after(&self, timeouts: u32) -> bool {
        match self {
            TimeoutPolicy::Unbounded => false,
            TimeoutPolicy::GiveUpAfter(cap) => timeouts >= *cap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub position_count: usize,
    pub block_count: usize,
    pub trials_per_block: usize,
    pub timeout_ms: f64,
    pub timeout_policy: TimeoutPolicy,
    pub pattern_length: usize,
    /// Blank screen after a correct response, before the next trial.
    pub feedback_ms: u64,
    /// Blank flash after an incorrect response, before re-presentation.
    pub error_flash_ms: u64,
    pub keys: KeyMap,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            position_count: 4,
            block_count: 8,
            trials_per_block: 60,
            timeout_ms: 5000.0,
            timeout_policy: TimeoutPolicy::Unbounded,
            pattern_length: 10,
            feedback_ms: 100,
            error_flash_ms: 200,
            keys: KeyMap::digits(),
        }
    }
}

impl SessionConfig {
    /// Reduced run for piloting: two blocks of ten trials.
    pub fn test_mode() -> Self {
        Self {
            block_count: 2,
            trials_per_block: 10,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.position_count == 0 {
            return Err(ConfigError::NoPositions);
        }
        if self.block_count == 0 {
            return Err(ConfigError::NoBlocks);
        }
        if self.trials_per_block == 0 {
            return Err(ConfigError::NoTrials);
        }
        if self.pattern_length == 0 {
            return Err(ConfigError::EmptyPattern);
        }
        self.timeout()?;
        if self.timeout_policy == TimeoutPolicy::GiveUpAfter(0) {
            return Err(ConfigError::ZeroTimeoutCap);
        }
        self.keys.check_covers(self.position_count)
    }

    /// The response window. It must be positive and fit the timer's `u64`
    /// nanosecond timestamps.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        let invalid = ConfigError::InvalidTimeout(self.timeout_ms);
        if !self.timeout_ms.is_finite() || self.timeout_ms <= 0.0 {
            return Err(invalid);
        }
        let window = Duration::try_from_secs_f64(self.timeout_ms / 1000.0)
            .map_err(|_| invalid.clone())?;
        if window.is_zero() || window.as_nanos() > u128::from(u64::MAX) {
            return Err(invalid);
        }
        Ok(window)
    }

    pub fn feedback(&self) -> Duration {
        Duration::from_millis(self.feedback_ms)
    }

    pub fn error_flash(&self) -> Duration {
        Duration::from_millis(self.error_flash_ms)
    }

    pub fn total_trials(&self) -> usize {
        self.block_count * self.trials_per_block
    }
}
