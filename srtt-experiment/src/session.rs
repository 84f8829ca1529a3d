use crate::block::{BlockController, SessionOutcome};
use crate::config::SessionConfig;
use crate::context::{InputContext, RenderContext};
use crate::recorder::{SessionRecorder, SessionSummary};
use crate::sequence::StructuredPattern;
use rand::Rng;
use srtt_core::{ConfigError, ExperimentError};
use srtt_timing::Timer;
use tracing::info;

/// One participant's run: validated configuration, the session's fixed
/// pattern, and the log everything gets recorded into.
pub struct Session<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    participant_id: String,
    config: SessionConfig,
    pattern: StructuredPattern,
    timer: T,
    rng: R,
    recorder: SessionRecorder,
    ran: bool,
}

impl<T, R> Session<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(
        participant_id: impl Into<String>,
        config: SessionConfig,
        timer: T,
        mut rng: R,
    ) -> Result<Self, ConfigError> {
        let participant_id = participant_id.into().trim().to_owned();
        if participant_id.is_empty() {
            return Err(ConfigError::BlankParticipant);
        }
        config.validate()?;
        let pattern =
            StructuredPattern::build(config.position_count, config.pattern_length, &mut rng)?;

        Ok(Self {
            participant_id,
            config,
            pattern,
            timer,
            rng,
            recorder: SessionRecorder::new(),
            ran: false,
        })
    }

    /// Runs every block. An abort is reported through the outcome; any other
    /// error is returned as-is and the records gathered so far stay
    /// available through [`Session::recorder`]. A session runs once; later
    /// calls fail with `ExperimentError::AlreadyRun` and leave the log alone.
    pub fn run<I, D>(
        &mut self,
        input: &mut I,
        render: &mut D,
    ) -> Result<SessionOutcome, ExperimentError>
    where
        I: InputContext + ?Sized,
        D: RenderContext + ?Sized,
    {
        if self.ran {
            return Err(ExperimentError::AlreadyRun);
        }
        self.ran = true;
        info!(
            participant = %self.participant_id,
            positions = self.config.position_count,
            blocks = self.config.block_count,
            trials_per_block = self.config.trials_per_block,
            total_trials = self.config.total_trials(),
            policy = ?self.config.timeout_policy,
            "session starting"
        );
        let outcome = BlockController::new(
            &self.participant_id,
            &self.config,
            &self.pattern,
            &self.timer,
            &mut self.rng,
        )
        .run(input, render, &mut self.recorder)?;
        info!(
            status = ?outcome.status,
            blocks = outcome.blocks.len(),
            records = self.recorder.len(),
            "session finished"
        );
        Ok(outcome)
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn pattern(&self) -> &StructuredPattern {
        &self.pattern
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    pub fn summarize(&self) -> SessionSummary {
        self.recorder.summarize()
    }
}
