use crate::config::SessionConfig;
use crate::context::{InputContext, RenderContext, TrialProgress};
use crate::recorder::SessionRecorder;
use crate::sequence::{BlockSequence, StructuredPattern};
use crate::trial::{Resolution, TrialRunner};
use rand::Rng;
use srtt_core::{BlockStatistics, BlockType, ExperimentError, TrialKey};
use srtt_timing::Timer;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Completed,
    /// Stopped early; everything recorded before the abort is kept.
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub status: SessionStatus,
    /// Statistics of every block that ran to completion.
    pub blocks: Vec<BlockStatistics>,
}

/// Runs blocks in order, alternating structured and random.
pub struct BlockController<'a, T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    participant_id: &'a str,
    config: &'a SessionConfig,
    pattern: &'a StructuredPattern,
    timer: &'a T,
    rng: &'a mut R,
}

impl<'a, T, R> BlockController<'a, T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(
        participant_id: &'a str,
        config: &'a SessionConfig,
        pattern: &'a StructuredPattern,
        timer: &'a T,
        rng: &'a mut R,
    ) -> Self {
        Self {
            participant_id,
            config,
            pattern,
            timer,
            rng,
        }
    }

    pub fn block_type(index: usize) -> BlockType {
        BlockType::for_index(index)
    }

    pub fn run<I, D>(
        &mut self,
        input: &mut I,
        render: &mut D,
        recorder: &mut SessionRecorder,
    ) -> Result<SessionOutcome, ExperimentError>
    where
        I: InputContext + ?Sized,
        D: RenderContext + ?Sized,
    {
        let total = self.config.block_count;
        let mut blocks = Vec::with_capacity(total);

        for index in 0..total {
            let block_number = index + 1;
            match self.run_block(index, input, render, recorder) {
                Ok(()) => {}
                Err(e) if e.is_abort() => {
                    info!(block = block_number, records = recorder.len(), "session aborted");
                    return Ok(SessionOutcome {
                        status: SessionStatus::Aborted,
                        blocks,
                    });
                }
                Err(e) => return Err(e),
            }

            if let Some(stats) = recorder.block_statistics(block_number) {
                info!(
                    block = block_number,
                    block_type = %stats.block_type,
                    mean_rt_ms = ?stats.mean_correct_rt_ms,
                    accuracy = ?stats.accuracy_percent,
                    "block complete"
                );
                blocks.push(stats);
            }

            if block_number < total {
                render.block_boundary(block_number, total);
                if !input.wait_to_continue()? {
                    info!(block = block_number, "session ended at break");
                    return Ok(SessionOutcome {
                        status: SessionStatus::Aborted,
                        blocks,
                    });
                }
            }
        }

        Ok(SessionOutcome {
            status: SessionStatus::Completed,
            blocks,
        })
    }

    fn run_block<I, D>(
        &mut self,
        index: usize,
        input: &mut I,
        render: &mut D,
        recorder: &mut SessionRecorder,
    ) -> Result<(), ExperimentError>
    where
        I: InputContext + ?Sized,
        D: RenderContext + ?Sized,
    {
        let block_type = Self::block_type(index);
        let sequence = BlockSequence::build(
            block_type,
            self.pattern,
            self.config.position_count,
            self.config.trials_per_block,
            &mut *self.rng,
        );
        debug!(block = index + 1, %block_type, ?sequence, "block sequence ready");

        let runner = TrialRunner::new(self.config, self.timer);
        for (trial_index, target) in sequence.iter().enumerate() {
            let key = TrialKey {
                participant_id: self.participant_id,
                block_number: index + 1,
                block_type,
                trial_number: trial_index + 1,
                position: target,
            };
            let progress = TrialProgress {
                block_number: index + 1,
                total_blocks: self.config.block_count,
                block_type,
                trial_number: trial_index + 1,
                trials_per_block: self.config.trials_per_block,
                position_count: self.config.position_count,
            };
            let outcome = runner.run(&key, &progress, input, render, recorder)?;
            if outcome.resolution == Resolution::GaveUp {
                info!(
                    block = index + 1,
                    trial = trial_index + 1,
                    timeouts = outcome.timeouts,
                    "trial abandoned after repeated timeouts"
                );
            }
        }
        Ok(())
    }
}
