use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use srtt_core::BlockType;
use srtt_experiment::{
    BlockSequence, ParticipantProfile, Session, SessionConfig, StructuredPattern, simulated_pair,
};
use srtt_timing::ManualTimer;

fn block_type() -> impl Strategy<Value = BlockType> {
    prop_oneof![Just(BlockType::Structured), Just(BlockType::Random)]
}

proptest! {
    #[test]
    fn sequences_never_repeat_a_position(
        position_count in 2usize..=10,
        trials in 1usize..200,
        pattern_length in 1usize..16,
        block_type in block_type(),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let pattern = StructuredPattern::build(position_count, pattern_length, &mut rng).unwrap();
        let sequence = BlockSequence::build(block_type, &pattern, position_count, trials, &mut rng);

        prop_assert_eq!(sequence.len(), trials);
        prop_assert!(sequence.iter().all(|p| p.index() < position_count));
        prop_assert!(sequence.as_slice().windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn synthesized_patterns_stay_in_range(
        position_count in 5usize..=10,
        pattern_length in 1usize..32,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let pattern = StructuredPattern::build(position_count, pattern_length, &mut rng).unwrap();

        prop_assert_eq!(pattern.len(), pattern_length);
        prop_assert!(pattern.as_slice().iter().all(|p| p.index() < position_count));
        prop_assert!(pattern.as_slice().windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn structured_blocks_follow_a_seamless_pattern(
        trials in 1usize..120,
        seed in any::<u64>(),
    ) {
        // The four-position pattern has no repeat across its wrap-around, so
        // tiling needs no repair.
        let mut rng = StdRng::seed_from_u64(seed);
        let pattern = StructuredPattern::canonical(4);
        let sequence = BlockSequence::build(BlockType::Structured, &pattern, 4, trials, &mut rng);
        let tiled: Vec<_> = pattern.as_slice().iter().copied().cycle().take(trials).collect();
        prop_assert_eq!(sequence.as_slice(), tiled.as_slice());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn attempts_are_numbered_from_one_and_end_on_a_hit(
        error_rate in 0.0f64..0.6,
        miss_rate in 0.0f64..0.2,
        seed in any::<u64>(),
    ) {
        let config = SessionConfig {
            block_count: 2,
            trials_per_block: 12,
            ..SessionConfig::default()
        };
        let timer = ManualTimer::new();
        let profile = ParticipantProfile { error_rate, miss_rate, ..ParticipantProfile::default() };
        let (mut participant, mut screen) =
            simulated_pair(timer.clone(), config.keys.clone(), profile, StdRng::seed_from_u64(!seed));
        let mut session = Session::new("prop", config, timer, StdRng::seed_from_u64(seed)).unwrap();
        session.run(&mut participant, &mut screen).unwrap();

        let records = session.recorder().records();
        let mut expected_attempt = 1;
        for (i, record) in records.iter().enumerate() {
            prop_assert_eq!(record.attempt_number(), expected_attempt);
            let last_of_trial = records.get(i + 1).is_none_or(|next| {
                (next.block_number(), next.trial_number())
                    != (record.block_number(), record.trial_number())
            });
            prop_assert_eq!(record.correct(), last_of_trial);
            expected_attempt = if last_of_trial { 1 } else { expected_attempt + 1 };
        }

        let summary = session.summarize();
        prop_assert_eq!(summary.structured.trials + summary.random.trials, 24);
        prop_assert_eq!(summary.correct_attempts, 24);
        prop_assert_eq!(summary.total_attempts, records.len());
    }
}
