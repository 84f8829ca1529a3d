//! A synthetic participant for dry runs.
//!
//! The participant watches a [`SimulatedScreen`] and answers on a
//! [`ManualTimer`], so a full session completes instantly. Latencies shrink
//! as the participant picks up second-order transitions, which gives
//! structured blocks a learning effect over random ones.

use crate::context::{InputContext, InputEvent, RenderContext, TrialProgress};
use rand::Rng;
use srtt_core::{ExperimentError, KeyMap, Position};
use srtt_timing::{ManualTimer, Timer};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantProfile {
    pub base_rt_ms: f64,
    pub jitter_ms: f64,
    /// Speed-up for a fully predictable target.
    pub learning_gain_ms: f64,
    pub min_rt_ms: f64,
    /// Chance of pressing a wrong position key.
    pub error_rate: f64,
    /// Chance of letting the response window lapse.
    pub miss_rate: f64,
}

impl Default for ParticipantProfile {
    fn default() -> Self {
        Self {
            base_rt_ms: 520.0,
            jitter_ms: 80.0,
            learning_gain_ms: 180.0,
            min_rt_ms: 150.0,
            error_rate: 0.04,
            miss_rate: 0.005,
        }
    }
}

#[derive(Debug, Default)]
struct Screen {
    target: Option<Position>,
    position_count: usize,
}

/// Render side of the simulation: records what is currently on screen.
#[derive(Debug, Clone)]
pub struct SimulatedScreen {
    screen: Rc<RefCell<Screen>>,
}

impl RenderContext for SimulatedScreen {
    fn present(&mut self, target: Position, progress: &TrialProgress) {
        let mut screen = self.screen.borrow_mut();
        screen.target = Some(target);
        screen.position_count = progress.position_count;
    }

    fn clear(&mut self) {
        self.screen.borrow_mut().target = None;
    }

    fn block_boundary(&mut self, _completed_block: usize, _total_blocks: usize) {}
}

pub struct SimulatedParticipant<R: Rng> {
    timer: ManualTimer,
    keys: KeyMap,
    profile: ParticipantProfile,
    rng: R,
    screen: Rc<RefCell<Screen>>,
    /// Counts of `(two back, one back) -> next` transitions seen so far.
    transitions: HashMap<(Position, Position), HashMap<Position, u32>>,
    history: [Option<Position>; 2],
    expectation: f64,
}

/// Builds a participant and the screen it watches.
pub fn simulated_pair<R: Rng>(
    timer: ManualTimer,
    keys: KeyMap,
    profile: ParticipantProfile,
    rng: R,
) -> (SimulatedParticipant<R>, SimulatedScreen) {
    let screen = Rc::new(RefCell::new(Screen::default()));
    let participant = SimulatedParticipant {
        timer,
        keys,
        profile,
        rng,
        screen: Rc::clone(&screen),
        transitions: HashMap::new(),
        history: [None, None],
        expectation: 0.0,
    };
    (participant, SimulatedScreen { screen })
}

impl<R: Rng> SimulatedParticipant<R> {
    /// How predictable `target` was from the two previous targets. Learned
    /// once per new target; re-presentations of the same target reuse it.
    fn observe(&mut self, target: Position) -> f64 {
        if self.history[1] == Some(target) {
            return self.expectation;
        }
        self.expectation = match self.history {
            [Some(a), Some(b)] => {
                let seen = self.transitions.entry((a, b)).or_default();
                let total: u32 = seen.values().sum();
                let hits = seen.get(&target).copied().unwrap_or(0);
                *seen.entry(target).or_default() += 1;
                hits as f64 / (total as f64 + 1.0)
            }
            _ => 0.0,
        };
        self.history = [self.history[1], Some(target)];
        self.expectation
    }

    fn sample_rt_ms(&mut self, expectation: f64) -> f64 {
        let jitter = self.profile.jitter_ms.abs();
        let noise = self.rng.random_range(-jitter..=jitter);
        (self.profile.base_rt_ms - self.profile.learning_gain_ms * expectation + noise)
            .max(self.profile.min_rt_ms)
    }

    fn pick_answer(&mut self, target: Position, position_count: usize) -> Position {
        if position_count < 2 || !self.rng.random_bool(self.profile.error_rate.clamp(0.0, 1.0)) {
            return target;
        }
        let index = self.rng.random_range(0..position_count - 1);
        Position::new(if index >= target.index() { index + 1 } else { index })
    }
}

impl<R: Rng> InputContext for SimulatedParticipant<R> {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, ExperimentError> {
        let (target, position_count) = {
            let screen = self.screen.borrow();
            (screen.target, screen.position_count)
        };
        let Some(target) = target else {
            self.timer.advance(timeout);
            return Ok(None);
        };

        let expectation = self.observe(target);
        if self.rng.random_bool(self.profile.miss_rate.clamp(0.0, 1.0)) {
            self.timer.advance(timeout);
            return Ok(None);
        }
        let rt_ms = self.sample_rt_ms(expectation);
        if rt_ms >= timeout.as_secs_f64() * 1e3 {
            self.timer.advance(timeout);
            return Ok(None);
        }
        self.timer.advance(Duration::from_micros((rt_ms * 1e3) as u64));

        let answer = self.pick_answer(target, position_count);
        let Some(symbol) = self
            .keys
            .symbol_for(answer)
            .or_else(|| self.keys.symbol_for(target))
        else {
            self.timer.advance(timeout);
            return Ok(None);
        };
        Ok(Some(InputEvent::Response {
            symbol,
            at_ns: self.timer.now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use srtt_core::BlockType;

    fn progress() -> TrialProgress {
        TrialProgress {
            block_number: 1,
            total_blocks: 1,
            block_type: BlockType::Structured,
            trial_number: 1,
            trials_per_block: 1,
            position_count: 4,
        }
    }

    #[test]
    fn answers_what_is_on_screen() {
        let timer = ManualTimer::new();
        let profile = ParticipantProfile {
            error_rate: 0.0,
            miss_rate: 0.0,
            ..ParticipantProfile::default()
        };
        let (mut participant, mut screen) = simulated_pair(
            timer.clone(),
            KeyMap::digits(),
            profile,
            StdRng::seed_from_u64(2),
        );
        screen.present(Position::new(3), &progress());
        let event = participant.next_event(Duration::from_secs(5)).unwrap();
        match event {
            Some(InputEvent::Response { symbol, at_ns }) => {
                assert_eq!(symbol, '4');
                assert_eq!(at_ns, timer.now());
                assert!(at_ns >= 150_000_000);
            }
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[test]
    fn blank_screen_lets_window_pass() {
        let timer = ManualTimer::new();
        let (mut participant, _screen) = simulated_pair(
            timer.clone(),
            KeyMap::digits(),
            ParticipantProfile::default(),
            StdRng::seed_from_u64(2),
        );
        assert_eq!(participant.next_event(Duration::from_secs(2)).unwrap(), None);
        assert_eq!(timer.now(), 2_000_000_000);
    }

    #[test]
    fn repeated_transitions_become_expected() {
        let (mut participant, _screen) = simulated_pair(
            ManualTimer::new(),
            KeyMap::digits(),
            ParticipantProfile::default(),
            StdRng::seed_from_u64(2),
        );
        let cycle = [0, 2, 1].map(Position::new);
        let mut last = 0.0;
        for _ in 0..20 {
            for target in cycle {
                last = participant.observe(target);
            }
        }
        assert!(last > 0.9, "expectation {last}");
    }
}
