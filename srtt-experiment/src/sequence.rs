//! Stimulus order generation.
//!
//! Structured blocks tile a fixed pattern chosen once per session; random
//! blocks are drawn fresh. Both avoid presenting the same position twice in
//! a row whenever more than one position exists.

use rand::Rng;
use srtt_core::{BlockType, ConfigError, Position};
use tracing::warn;

/// Ten-item pattern with balanced transitions, used up to four positions.
pub const CANONICAL_PATTERN: [usize; 10] = [0, 2, 1, 0, 3, 1, 2, 3, 0, 1];
const CANONICAL_MAX_POSITIONS: usize = 4;

/// The repeating order behind structured blocks. Fixed for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredPattern {
    positions: Vec<Position>,
}

impl StructuredPattern {
    /// Canonical pattern for up to four positions; otherwise `length` draws
    /// that never repeat the previous entry.
    pub fn build<R: Rng + ?Sized>(
        position_count: usize,
        length: usize,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        if position_count == 0 {
            return Err(ConfigError::NoPositions);
        }
        if position_count <= CANONICAL_MAX_POSITIONS {
            return Ok(Self::canonical(position_count));
        }
        if length == 0 {
            return Err(ConfigError::EmptyPattern);
        }

        let mut positions = Vec::with_capacity(length);
        for _ in 0..length {
            let excluded: Vec<Position> = positions.last().copied().into_iter().collect();
            let next = draw_excluding(rng, position_count, &excluded)
                .unwrap_or_else(|| Position::new(0));
            positions.push(next);
        }
        Ok(Self { positions })
    }

    /// The canonical pattern restricted to `position_count` positions, with
    /// any repeats left behind by the dropped entries collapsed.
    pub fn canonical(position_count: usize) -> Self {
        let mut positions: Vec<Position> = Vec::with_capacity(CANONICAL_PATTERN.len());
        for &index in CANONICAL_PATTERN.iter().filter(|&&i| i < position_count) {
            let position = Position::new(index);
            if positions.last() != Some(&position) {
                positions.push(position);
            }
        }
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.positions
    }
}

/// Target positions for one block, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSequence {
    positions: Vec<Position>,
}

impl BlockSequence {
    pub fn build<R: Rng + ?Sized>(
        block_type: BlockType,
        pattern: &StructuredPattern,
        position_count: usize,
        trials_per_block: usize,
        rng: &mut R,
    ) -> Self {
        if position_count < 2 {
            warn!(
                position_count,
                "no-repeat constraint cannot hold with a single position, allowing repeats"
            );
        }
        let positions = match block_type {
            BlockType::Structured => tile_pattern(pattern, position_count, trials_per_block, rng),
            BlockType::Random => draw_random(position_count, trials_per_block, rng),
        };
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions.iter().copied()
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.positions
    }
}

/// Repeats the pattern to `len` entries, then breaks any adjacent repeat by
/// redrawing the later entry. A redraw also avoids the following entry when
/// another candidate exists, so one forward pass leaves no repeats behind.
fn tile_pattern<R: Rng + ?Sized>(
    pattern: &StructuredPattern,
    position_count: usize,
    len: usize,
    rng: &mut R,
) -> Vec<Position> {
    let mut seq: Vec<Position> = pattern.as_slice().iter().copied().cycle().take(len).collect();
    if position_count < 2 {
        return seq;
    }

    for i in 1..seq.len() {
        if seq[i] != seq[i - 1] {
            continue;
        }
        let prev = seq[i - 1];
        let mut excluded = vec![prev];
        if let Some(&next) = seq.get(i + 1) {
            excluded.push(next);
        }
        if let Some(replacement) = draw_excluding(rng, position_count, &excluded)
            .or_else(|| draw_excluding(rng, position_count, &[prev]))
        {
            seq[i] = replacement;
        }
    }
    seq
}

fn draw_random<R: Rng + ?Sized>(position_count: usize, len: usize, rng: &mut R) -> Vec<Position> {
    let mut seq: Vec<Position> = Vec::with_capacity(len);
    for _ in 0..len {
        let excluded: Vec<Position> = seq.last().copied().into_iter().collect();
        let next = draw_excluding(rng, position_count, &excluded)
            .unwrap_or_else(|| Position::new(rng.random_range(0..position_count.max(1))));
        seq.push(next);
    }
    seq
}

/// Uniform draw from `[0, position_count)` minus `excluded`; `None` when
/// nothing is left to draw from.
fn draw_excluding<R: Rng + ?Sized>(
    rng: &mut R,
    position_count: usize,
    excluded: &[Position],
) -> Option<Position> {
    let candidates: Vec<usize> = (0..position_count)
        .filter(|&i| !excluded.contains(&Position::new(i)))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    Some(Position::new(candidates[rng.random_range(0..candidates.len())]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn indices(positions: &[Position]) -> Vec<usize> {
        positions.iter().map(|p| p.index()).collect()
    }

    fn has_adjacent_repeat(positions: &[Position]) -> bool {
        positions.windows(2).any(|w| w[0] == w[1])
    }

    #[test]
    fn four_positions_use_canonical_pattern() {
        let mut rng = StdRng::seed_from_u64(1);
        let pattern = StructuredPattern::build(4, 10, &mut rng).unwrap();
        assert_eq!(indices(pattern.as_slice()), CANONICAL_PATTERN.to_vec());
    }

    #[test]
    fn fewer_positions_keep_canonical_order_in_range() {
        let pattern = StructuredPattern::canonical(3);
        assert_eq!(indices(pattern.as_slice()), vec![0, 2, 1, 0, 1, 2, 0, 1]);
        let pattern = StructuredPattern::canonical(2);
        assert_eq!(indices(pattern.as_slice()), vec![0, 1, 0, 1, 0, 1]);
        let pattern = StructuredPattern::canonical(1);
        assert_eq!(indices(pattern.as_slice()), vec![0]);
    }

    #[test]
    fn synthesized_pattern_has_no_repeats() {
        let mut rng = StdRng::seed_from_u64(7);
        let pattern = StructuredPattern::build(6, 10, &mut rng).unwrap();
        assert_eq!(pattern.len(), 10);
        assert!(pattern.as_slice().iter().all(|p| p.index() < 6));
        assert!(!has_adjacent_repeat(pattern.as_slice()));
    }

    #[test]
    fn zero_positions_fail() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            StructuredPattern::build(0, 10, &mut rng),
            Err(ConfigError::NoPositions)
        );
        assert_eq!(
            StructuredPattern::build(5, 0, &mut rng),
            Err(ConfigError::EmptyPattern)
        );
    }

    #[test]
    fn structured_block_tiles_and_truncates() {
        let mut rng = StdRng::seed_from_u64(3);
        let pattern = StructuredPattern::canonical(4);
        let seq = BlockSequence::build(BlockType::Structured, &pattern, 4, 25, &mut rng);
        let expected: Vec<usize> = CANONICAL_PATTERN.iter().copied().cycle().take(25).collect();
        assert_eq!(indices(seq.as_slice()), expected);
    }

    #[test]
    fn tiling_seam_repeat_is_repaired() {
        // Pattern ends where it starts, so every seam repeats.
        let pattern = StructuredPattern {
            positions: vec![Position::new(1), Position::new(3), Position::new(1)],
        };
        let mut rng = StdRng::seed_from_u64(11);
        let seq = BlockSequence::build(BlockType::Structured, &pattern, 5, 30, &mut rng);
        assert_eq!(seq.len(), 30);
        assert!(!has_adjacent_repeat(seq.as_slice()));
    }

    #[test]
    fn repair_with_two_positions_cascades_forward() {
        let pattern = StructuredPattern {
            positions: vec![Position::new(0), Position::new(0), Position::new(1)],
        };
        let mut rng = StdRng::seed_from_u64(5);
        let seq = BlockSequence::build(BlockType::Structured, &pattern, 2, 12, &mut rng);
        assert!(!has_adjacent_repeat(seq.as_slice()));
    }

    #[test]
    fn random_block_never_repeats() {
        let mut rng = StdRng::seed_from_u64(42);
        let pattern = StructuredPattern::canonical(4);
        for count in 2..=10 {
            let seq = BlockSequence::build(BlockType::Random, &pattern, count, 200, &mut rng);
            assert_eq!(seq.len(), 200);
            assert!(seq.iter().all(|p| p.index() < count));
            assert!(!has_adjacent_repeat(seq.as_slice()), "count={count}");
        }
    }

    #[test]
    fn single_position_falls_back_to_repeats() {
        let mut rng = StdRng::seed_from_u64(9);
        let pattern = StructuredPattern::canonical(1);
        for block_type in [BlockType::Structured, BlockType::Random] {
            let seq = BlockSequence::build(block_type, &pattern, 1, 5, &mut rng);
            assert_eq!(indices(seq.as_slice()), vec![0; 5]);
        }
    }
}
