//! Granularity levels of the bisection game.

use serde::{Deserialize, Serialize};
use std::fmt;

use vigil_types::GameParams;

/// The granularity an edge's heights are measured in.
///
/// One step at a coarser level is refined by a full range of the next finer
/// level: `Block -> BigStep(0) -> .. -> BigStep(n-1) -> SmallStep`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeLevel {
    Block,
    BigStep(u8),
    SmallStep,
}

impl EdgeLevel {
    /// Two-byte tag bound into edge ids.
    pub fn tag(&self) -> [u8; 2] {
        match self {
            Self::Block => [0, 0],
            Self::BigStep(i) => [1, *i],
            Self::SmallStep => [2, 0],
        }
    }

    /// Maximum height range of an edge at this level.
    pub fn leaf_size(&self, game: &GameParams) -> u64 {
        match self {
            Self::Block => game.block_leaf_size,
            Self::BigStep(_) => game.big_step_leaf_size,
            Self::SmallStep => game.small_step_leaf_size,
        }
    }

    /// The next finer level, or `None` at the small-step level.
    pub fn next(&self, game: &GameParams) -> Option<EdgeLevel> {
        let first_after = |i: u8| {
            if i < game.num_big_step_levels {
                EdgeLevel::BigStep(i)
            } else {
                EdgeLevel::SmallStep
            }
        };
        match self {
            Self::Block => Some(first_after(0)),
            Self::BigStep(i) => Some(first_after(i.saturating_add(1))),
            Self::SmallStep => None,
        }
    }

    /// Whether single steps at this level go to the one-step verifier.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::SmallStep)
    }
}

impl fmt::Display for EdgeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::BigStep(i) => write!(f, "big-step[{i}]"),
            Self::SmallStep => write!(f, "small-step"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(levels: u8) -> GameParams {
        GameParams {
            block_leaf_size: 16,
            big_step_leaf_size: 8,
            small_step_leaf_size: 4,
            num_big_step_levels: levels,
            round_timeout_blocks: 10,
        }
    }

    #[test]
    fn levels_descend_through_big_steps() {
        let g = game(2);
        assert_eq!(EdgeLevel::Block.next(&g), Some(EdgeLevel::BigStep(0)));
        assert_eq!(EdgeLevel::BigStep(0).next(&g), Some(EdgeLevel::BigStep(1)));
        assert_eq!(EdgeLevel::BigStep(1).next(&g), Some(EdgeLevel::SmallStep));
        assert_eq!(EdgeLevel::SmallStep.next(&g), None);
    }

    #[test]
    fn no_big_steps_goes_straight_to_small_step() {
        assert_eq!(EdgeLevel::Block.next(&game(0)), Some(EdgeLevel::SmallStep));
    }

    #[test]
    fn leaf_sizes_follow_params() {
        let g = game(1);
        assert_eq!(EdgeLevel::Block.leaf_size(&g), 16);
        assert_eq!(EdgeLevel::BigStep(0).leaf_size(&g), 8);
        assert_eq!(EdgeLevel::SmallStep.leaf_size(&g), 4);
    }

    #[test]
    fn tags_are_distinct() {
        assert_ne!(EdgeLevel::Block.tag(), EdgeLevel::BigStep(0).tag());
        assert_ne!(EdgeLevel::BigStep(0).tag(), EdgeLevel::BigStep(1).tag());
        assert_ne!(EdgeLevel::BigStep(0).tag(), EdgeLevel::SmallStep.tag());
    }
}
