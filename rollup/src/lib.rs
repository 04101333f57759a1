//! The assertion chain of the vigil rollup.
//!
//! Stakers back claims (assertions) about L2 state. Conflicting siblings are
//! settled by the bisection game in `vigil-challenge`; the chain applies the
//! verdict, then confirms the surviving branch strictly in creation order.
//!
//! Every operation takes the caller address and the current host block
//! explicitly and either mutates state completely or returns an error
//! without touching it.

pub mod admin;
pub mod assertion;
pub mod chain;
pub mod dispute;
pub mod error;
pub mod event;
pub mod inbox;
pub mod snapshot;
pub mod staker;
pub mod staking;

#[cfg(test)]
mod test_support;

pub use assertion::{Assertion, AssertionNode, AssertionStatus, NewAssertion};
pub use chain::AssertionChain;
pub use dispute::ChallengeStart;
pub use error::RollupError;
pub use event::{AdminOp, RollupEvent};
pub use inbox::Inbox;
pub use snapshot::{ChainSnapshot, SnapshotBody, SNAPSHOT_VERSION};
pub use staker::{Staker, Zombie};
pub use staking::required_stake;
