use crate::trial::TrialRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Whether a block follows the hidden pattern or an unpredictable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Structured,
    Random,
}

impl BlockType {
    /// Even 0-based block indices are structured, odd ones random.
    pub const fn for_index(index: usize) -> Self {
        if index % 2 == 0 {
            BlockType::Structured
        } else {
            BlockType::Random
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BlockType::Structured => "structured",
            BlockType::Random => "random",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-block aggregates. Means over an empty set are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockStatistics {
    pub block_number: usize,
    pub block_type: BlockType,
    pub trials: usize,
    pub attempts: usize,
    pub correct_attempts: usize,
    /// Mean latency of correct attempts only.
    pub mean_correct_rt_ms: Option<f64>,
    /// Correct attempts over all attempts, in percent.
    pub accuracy_percent: Option<f64>,
    pub mean_attempts_per_trial: Option<f64>,
}

impl BlockStatistics {
    /// Aggregates the records of `block_number` out of a session log.
    /// Returns `None` when the block has no records yet.
    pub fn compute(block_number: usize, log: &[TrialRecord]) -> Option<Self> {
        let mut records = log
            .iter()
            .filter(|r| r.block_number() == block_number)
            .peekable();
        let block_type = records.peek()?.block_type();

        let mut trials = BTreeSet::new();
        let mut attempts = 0usize;
        let mut correct_attempts = 0usize;
        let mut correct_rt_sum = 0.0;
        for record in records {
            trials.insert(record.trial_number());
            attempts += 1;
            if record.correct() {
                correct_attempts += 1;
                correct_rt_sum += record.reaction_time_ms();
            }
        }

        Some(Self {
            block_number,
            block_type,
            trials: trials.len(),
            attempts,
            correct_attempts,
            mean_correct_rt_ms: mean(correct_rt_sum, correct_attempts),
            accuracy_percent: mean(correct_attempts as f64 * 100.0, attempts),
            mean_attempts_per_trial: mean(attempts as f64, trials.len()),
        })
    }
}

/// `sum / count`, or `None` for an empty set.
pub fn mean(sum: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}
