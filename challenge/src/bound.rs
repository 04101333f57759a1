//! Worst-case game length, computable from configuration alone.
//!
//! A level whose range is `n` needs `ceil(log2(n))` bisection rounds, each
//! round being one move per side, before it reaches a single step. The last
//! level then needs one more move: the one-step proof. Every move must land
//! within `round_timeout_blocks` of the previous one, and a missed move can be
//! timed out one block after its deadline.

use vigil_types::GameParams;

/// `ceil(log2(n))`, with `0` for `n <= 1`.
pub fn ceil_log2(n: u64) -> u64 {
    if n <= 1 {
        0
    } else {
        u64::from(64 - (n - 1).leading_zeros())
    }
}

/// Upper bound on moves (bisections plus the final proof) in one challenge.
pub fn max_moves(game: &GameParams) -> u64 {
    let rounds = ceil_log2(game.block_leaf_size)
        + u64::from(game.num_big_step_levels) * ceil_log2(game.big_step_leaf_size)
        + ceil_log2(game.small_step_leaf_size);
    2 * rounds + 1
}

/// Upper bound, in blocks, between a challenge's creation and its resolution.
pub fn max_duration_blocks(game: &GameParams) -> u64 {
    max_moves(game)
        .saturating_mul(game.round_timeout_blocks)
        .saturating_add(1)
}
