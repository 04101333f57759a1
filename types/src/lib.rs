//! Fundamental types for the vigil rollup.
//!
//! This crate defines the value types shared by every other crate in the
//! workspace: hashes and ids, addresses, stake amounts, block numbers,
//! claimed execution state, and chain parameters.

pub mod address;
pub mod amount;
pub mod crank;
pub mod error;
pub mod hash;
pub mod ids;
pub mod params;
pub mod state;
pub mod time;

pub use address::Address;
pub use amount::Amount;
pub use crank::{Crank, NotYet};
pub use error::VigilError;
pub use hash::Bytes32;
pub use ids::{AssertionId, ChallengeId, EdgeId};
pub use params::{GameParams, RollupParams, MAX_BIG_STEP_LEVELS};
pub use state::{ExecutionState, GlobalState, MachineStatus};
pub use time::{BlockClock, BlockNumber};
