//! Rollup and challenge-game parameters.
//!
//! These are fixed when a chain is initialised. They are plain data so the
//! node can load them from its TOML configuration.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::Amount;
use crate::error::VigilError;
use crate::hash::Bytes32;
use crate::state::ExecutionState;

/// Upper bound on big-step levels: level tags must fit in a byte.
pub const MAX_BIG_STEP_LEVELS: u8 = 253;

/// Granularity configuration for the bisection game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameParams {
    /// Maximum L2 blocks one assertion may cover; also the block-level range bound.
    pub block_leaf_size: u64,
    /// Number of big steps in one step of the level above.
    pub big_step_leaf_size: u64,
    /// Number of machine steps in one big step of the finest big-step level.
    pub small_step_leaf_size: u64,
    /// How many big-step levels sit between the block and small-step levels.
    pub num_big_step_levels: u8,
    /// Blocks a participant has to make each move.
    pub round_timeout_blocks: u64,
}

impl Default for GameParams {
    fn default() -> Self {
        Self {
            block_leaf_size: 1 << 26,
            big_step_leaf_size: 1 << 23,
            small_step_leaf_size: 1 << 20,
            num_big_step_levels: 1,
            round_timeout_blocks: 6_400,
        }
    }
}

impl GameParams {
    pub fn validate(&self) -> Result<(), VigilError> {
        if self.block_leaf_size == 0 || self.big_step_leaf_size == 0 || self.small_step_leaf_size == 0 {
            return Err(VigilError::InvalidParams("leaf sizes must be non-zero".into()));
        }
        if self.num_big_step_levels > MAX_BIG_STEP_LEVELS {
            return Err(VigilError::InvalidParams(format!(
                "at most {MAX_BIG_STEP_LEVELS} big-step levels, got {}",
                self.num_big_step_levels
            )));
        }
        if self.round_timeout_blocks == 0 {
            return Err(VigilError::InvalidParams("round timeout must be non-zero".into()));
        }
        Ok(())
    }
}

/// Parameters of one assertion chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupParams {
    /// Stake required to back an assertion while nothing is overdue.
    pub base_stake: Amount,
    /// Blocks an assertion must wait before it can be confirmed.
    pub confirm_period_blocks: u64,
    /// Extra blocks granted to an assertion created while a sibling exists.
    pub extra_challenge_time_blocks: u64,
    /// Minimum blocks between a parent's creation and a new child.
    pub minimum_assertion_period: u64,
    /// Root of the L2 machine code; bound into every assertion id.
    pub wasm_module_root: Bytes32,
    /// Admin allowed to pause and to run force operations.
    pub owner: Address,
    /// Receives the forfeited half of every losing stake.
    pub loser_stake_escrow: Address,
    /// After-state of the genesis assertion.
    pub genesis_state: ExecutionState,
    /// Inbox size recorded on the genesis assertion.
    pub genesis_inbox_count: u64,
    pub game: GameParams,
}

impl RollupParams {
    /// Short periods and tiny leaves for local development and tests.
    pub fn dev() -> Self {
        Self {
            base_stake: Amount::new(10),
            confirm_period_blocks: 100,
            extra_challenge_time_blocks: 20,
            minimum_assertion_period: 75,
            wasm_module_root: Bytes32::ZERO,
            owner: Address::new([0xad; 20]),
            loser_stake_escrow: Address::new([0xee; 20]),
            genesis_state: ExecutionState::genesis(),
            genesis_inbox_count: 0,
            game: GameParams {
                block_leaf_size: 32,
                big_step_leaf_size: 8,
                small_step_leaf_size: 4,
                num_big_step_levels: 1,
                round_timeout_blocks: 10,
            },
        }
    }

    pub fn validate(&self) -> Result<(), VigilError> {
        if self.confirm_period_blocks == 0 {
            return Err(VigilError::InvalidParams("confirm period must be non-zero".into()));
        }
        if self.base_stake.is_zero() {
            return Err(VigilError::InvalidParams("base stake must be non-zero".into()));
        }
        self.game.validate()
    }
}

impl Default for RollupParams {
    fn default() -> Self {
        Self {
            base_stake: Amount::new(1_000_000_000_000_000_000),
            confirm_period_blocks: 45_818,
            extra_challenge_time_blocks: 200,
            minimum_assertion_period: 75,
            wasm_module_root: Bytes32::ZERO,
            owner: Address::ZERO,
            loser_stake_escrow: Address::ZERO,
            genesis_state: ExecutionState::genesis(),
            genesis_inbox_count: 0,
            game: GameParams::default(),
        }
    }
}
