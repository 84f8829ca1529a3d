use serde::Serialize;
use srtt_core::block::mean;
use srtt_core::{BlockStatistics, BlockType, TrialRecord};
use std::collections::BTreeMap;
use std::fmt;

/// Append-only log of every attempt in a session.
#[derive(Debug, Default)]
pub struct SessionRecorder {
    log: Vec<TrialRecord>,
    hit_times_ns: Vec<u64>,
}

/// Aggregates for one block type across the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSummary {
    pub trials: usize,
    pub attempts: usize,
    pub correct_attempts: usize,
    pub mean_correct_rt_ms: Option<f64>,
    pub mean_attempts_per_trial: Option<f64>,
}

/// Session-level outcome measures. `None` marks a mean over an empty set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub participant_id: Option<String>,
    pub structured: TypeSummary,
    pub random: TypeSummary,
    /// Random minus structured mean correct RT.
    pub learning_effect_ms: Option<f64>,
    pub total_attempts: usize,
    pub correct_attempts: usize,
    pub accuracy_percent: Option<f64>,
    /// Mean gap between consecutive correct responses.
    pub mean_inter_hit_ms: Option<f64>,
    pub blocks: Vec<BlockStatistics>,
}

/// One flat row of the exported log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub participant_id: String,
    pub block: usize,
    pub block_type: BlockType,
    pub trial: usize,
    pub position: usize,
    pub reaction_time: f64,
    pub correct: bool,
    pub attempt: usize,
    pub timestamp: String,
}

impl ExportRow {
    pub const COLUMNS: [&'static str; 9] = [
        "participant_id",
        "block",
        "block_type",
        "trial",
        "position",
        "reaction_time",
        "correct",
        "attempt",
        "timestamp",
    ];
    pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    fn from_record(record: &TrialRecord) -> Self {
        Self {
            participant_id: record.participant_id().to_owned(),
            block: record.block_number(),
            block_type: record.block_type(),
            trial: record.trial_number(),
            position: record.position().number(),
            reaction_time: (record.reaction_time_ms() * 100.0).round() / 100.0,
            correct: record.correct(),
            attempt: record.attempt_number(),
            timestamp: record
                .timestamp()
                .format(Self::TIMESTAMP_FORMAT)
                .to_string(),
        }
    }

    /// Field values in `COLUMNS` order.
    pub fn fields(&self) -> [String; 9] {
        [
            self.participant_id.clone(),
            self.block.to_string(),
            self.block_type.to_string(),
            self.trial.to_string(),
            self.position.to_string(),
            format!("{:.2}", self.reaction_time),
            self.correct.to_string(),
            self.attempt.to_string(),
            self.timestamp.clone(),
        ]
    }
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: TrialRecord) {
        self.log.push(record);
    }

    /// Notes when a correct response landed, for inter-hit intervals.
    pub fn mark_hit(&mut self, at_ns: u64) {
        self.hit_times_ns.push(at_ns);
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn block_statistics(&self, block_number: usize) -> Option<BlockStatistics> {
        BlockStatistics::compute(block_number, &self.log)
    }

    pub fn summarize(&self) -> SessionSummary {
        let mut blocks: Vec<BlockStatistics> = Vec::new();
        for record in &self.log {
            let block = record.block_number();
            if blocks.iter().all(|b| b.block_number != block)
                && let Some(stats) = self.block_statistics(block)
            {
                blocks.push(stats);
            }
        }

        let structured = self.type_summary(BlockType::Structured);
        let random = self.type_summary(BlockType::Random);
        let learning_effect_ms = random
            .mean_correct_rt_ms
            .zip(structured.mean_correct_rt_ms)
            .map(|(r, s)| r - s);

        let total_attempts = self.log.len();
        let correct_attempts = self.log.iter().filter(|r| r.correct()).count();

        let gaps_ns: u64 = self
            .hit_times_ns
            .windows(2)
            .map(|w| w[1].saturating_sub(w[0]))
            .sum();
        let mean_inter_hit_ms = mean(
            gaps_ns as f64 / 1_000_000.0,
            self.hit_times_ns.len().saturating_sub(1),
        );

        SessionSummary {
            participant_id: self.log.first().map(|r| r.participant_id().to_owned()),
            structured,
            random,
            learning_effect_ms,
            total_attempts,
            correct_attempts,
            accuracy_percent: mean(correct_attempts as f64 * 100.0, total_attempts),
            mean_inter_hit_ms,
            blocks,
        }
    }

    fn type_summary(&self, block_type: BlockType) -> TypeSummary {
        let mut per_trial: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        let mut correct_attempts = 0usize;
        let mut rt_sum = 0.0;
        for record in self.log.iter().filter(|r| r.block_type() == block_type) {
            *per_trial
                .entry((record.block_number(), record.trial_number()))
                .or_default() += 1;
            if record.correct() {
                correct_attempts += 1;
                rt_sum += record.reaction_time_ms();
            }
        }
        let attempts: usize = per_trial.values().sum();

        TypeSummary {
            trials: per_trial.len(),
            attempts,
            correct_attempts,
            mean_correct_rt_ms: mean(rt_sum, correct_attempts),
            mean_attempts_per_trial: mean(attempts as f64, per_trial.len()),
        }
    }

    pub fn export_rows(&self) -> Vec<ExportRow> {
        self.log.iter().map(ExportRow::from_record).collect()
    }
}

fn fmt_opt(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.2}{unit}"),
        None => "undefined".to_owned(),
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Attempts: {}, correct: {}, accuracy: {}",
            self.total_attempts,
            self.correct_attempts,
            fmt_opt(self.accuracy_percent, "%")
        )?;
        for (label, t) in [("Structured", &self.structured), ("Random", &self.random)] {
            writeln!(
                f,
                "{label}: mean RT {}, mean attempts {}",
                fmt_opt(t.mean_correct_rt_ms, " ms"),
                fmt_opt(t.mean_attempts_per_trial, "")
            )?;
        }
        writeln!(
            f,
            "Learning effect: {}",
            fmt_opt(self.learning_effect_ms, " ms")
        )?;
        write!(
            f,
            "Mean time between hits: {}",
            fmt_opt(self.mean_inter_hit_ms, " ms")
        )
    }
}
