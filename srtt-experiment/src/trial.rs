use crate::config::SessionConfig;
use crate::context::{InputContext, InputEvent, RenderContext, TrialProgress};
use crate::recorder::SessionRecorder;
use srtt_core::{Attempt, ExperimentError, TrialKey, TrialRecord, TrialState};
use srtt_timing::Timer;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Ended on a correct response.
    Correct,
    /// Abandoned after the configured number of timeouts.
    GaveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialOutcome {
    /// Records emitted for the trial, timeouts included.
    pub attempts: usize,
    pub timeouts: u32,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Copy)]
struct TrialTimestamps {
    onset: u64,
    cycle_start: u64,
}

/// Resolves one target position into one or more attempt records.
pub struct TrialRunner<'a, T: Timer<Timestamp = u64>> {
    config: &'a SessionConfig,
    timer: &'a T,
}

impl<'a, T> TrialRunner<'a, T>
where
    T: Timer<Timestamp = u64>,
{
    pub fn new(config: &'a SessionConfig, timer: &'a T) -> Self {
        Self { config, timer }
    }

    /// Runs the trial to resolution, appending each attempt to `recorder`
    /// as it happens. An abort seen while waiting returns
    /// `ExperimentError::Aborted` and records nothing for that wait.
    pub fn run<I, D>(
        &self,
        key: &TrialKey<'_>,
        progress: &TrialProgress,
        input: &mut I,
        render: &mut D,
        recorder: &mut SessionRecorder,
    ) -> Result<TrialOutcome, ExperimentError>
    where
        I: InputContext + ?Sized,
        D: RenderContext + ?Sized,
    {
        let window = self.config.timeout()?;
        let target = key.position;

        render.present(target, progress);
        let now = self.timer.now();
        let mut ts = TrialTimestamps {
            onset: now,
            cycle_start: now,
        };
        let mut attempts = 0usize;
        let mut timeouts = 0u32;
        let mut state = TrialState::AwaitingResponse;

        loop {
            match state {
                TrialState::AwaitingResponse => {
                    let remaining = window.saturating_sub(self.timer.elapsed(ts.cycle_start));
                    match input.next_event(remaining)? {
                        Some(InputEvent::Abort) => {
                            debug!(
                                block = key.block_number,
                                trial = key.trial_number,
                                "abort while awaiting response"
                            );
                            return Err(ExperimentError::Aborted);
                        }
                        None => {
                            if self.timer.elapsed(ts.cycle_start) < window {
                                continue;
                            }
                            attempts += 1;
                            timeouts += 1;
                            self.record(key, attempts, self.config.timeout_ms, false, recorder)?;
                            if self.config.timeout_policy.gives_up_after(timeouts) {
                                debug!(
                                    block = key.block_number,
                                    trial = key.trial_number,
                                    timeouts,
                                    "giving up on trial"
                                );
                                return Ok(TrialOutcome {
                                    attempts,
                                    timeouts,
                                    resolution: Resolution::GaveUp,
                                });
                            }
                            render.present(target, progress);
                            ts.cycle_start = self.timer.now();
                        }
                        Some(InputEvent::Response { symbol, at_ns }) => {
                            let Some(answer) = self.config.keys.lookup(symbol) else {
                                debug!(%symbol, "ignoring unmapped key");
                                continue;
                            };
                            attempts += 1;
                            let correct = answer == target;
                            let rt_ms = latency_ms(
                                at_ns.saturating_sub(ts.cycle_start),
                                self.config.timeout_ms,
                            );
                            self.record(key, attempts, rt_ms, correct, recorder)?;
                            if correct {
                                recorder.mark_hit(at_ns);
                            }
                            state = TrialState::Scored { correct };
                        }
                    }
                }
                TrialState::Scored { correct: true } => {
                    render.clear();
                    self.timer.sleep(self.config.feedback());
                    state = TrialState::Resolved;
                }
                TrialState::Scored { correct: false } => {
                    render.clear();
                    self.timer.sleep(self.config.error_flash());
                    render.present(target, progress);
                    ts.cycle_start = self.timer.now();
                    state = TrialState::AwaitingResponse;
                }
                TrialState::Resolved => {
                    debug!(
                        block = key.block_number,
                        trial = key.trial_number,
                        attempts,
                        total_ms = self.timer.elapsed(ts.onset).as_secs_f64() * 1e3,
                        "trial resolved"
                    );
                    return Ok(TrialOutcome {
                        attempts,
                        timeouts,
                        resolution: Resolution::Correct,
                    });
                }
            }
        }
    }

    fn record(
        &self,
        key: &TrialKey<'_>,
        attempt: usize,
        rt_ms: f64,
        correct: bool,
        recorder: &mut SessionRecorder,
    ) -> Result<(), ExperimentError> {
        let record = TrialRecord::new(
            key,
            Attempt::new(attempt, rt_ms, correct),
            self.config.timeout_ms,
        )?;
        debug!(
            block = key.block_number,
            trial = key.trial_number,
            attempt,
            rt_ms,
            correct,
            "attempt recorded"
        );
        recorder.append(record);
        Ok(())
    }
}

/// Latency in milliseconds, clamped to the response window.
fn latency_ms(latency_ns: u64, window_ms: f64) -> f64 {
    (latency_ns as f64 / 1_000_000.0).min(window_ms)
}
