//! Assertions and their place in the claim tree.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use vigil_types::{Address, AssertionId, BlockNumber, Bytes32, ExecutionState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssertionStatus {
    Pending,
    Confirmed,
    Rejected,
}

/// A staked claim about the state reached after `num_steps` blocks of
/// execution from the parent's after-state. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub id: AssertionId,
    pub parent_id: AssertionId,
    /// Creation order. Genesis is 0.
    pub seq: u64,
    pub before_state: ExecutionState,
    pub after_state: ExecutionState,
    pub num_steps: u64,
    /// Inbox size when the assertion was created. Children must read at
    /// least this far.
    pub inbox_max_count: u64,
    pub proposed_at: BlockNumber,
    pub deadline: BlockNumber,
    pub is_first_child: bool,
}

/// Caller-supplied content of a new assertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssertion {
    pub parent: AssertionId,
    pub before_state: ExecutionState,
    pub after_state: ExecutionState,
    pub num_steps: u64,
}

/// An assertion plus the mutable bookkeeping the chain keeps for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionNode {
    pub assertion: Assertion,
    pub status: AssertionStatus,
    pub execution_hash: Bytes32,
    pub inbox_accumulator: Bytes32,
    /// `H(blockHash, sendRoot)` of the after-state, checked on confirmation.
    pub confirm_data: Bytes32,
    /// Every staker whose path passes through this assertion, zombies included
    /// until they are removed.
    pub stakers: BTreeSet<Address>,
    /// Stakers on this assertion's children, summed over all children.
    pub child_staker_count: u64,
    pub latest_child: Option<AssertionId>,
    pub first_child_at: Option<BlockNumber>,
    /// No child may be confirmed before this height.
    pub no_child_confirmed_before: Option<BlockNumber>,
}

impl AssertionNode {
    pub(crate) fn new(
        assertion: Assertion,
        execution_hash: Bytes32,
        inbox_accumulator: Bytes32,
    ) -> Self {
        let gs = &assertion.after_state.global_state;
        let confirm_data = vigil_crypto::confirm_data(&gs.block_hash, &gs.send_root);
        Self {
            assertion,
            status: AssertionStatus::Pending,
            execution_hash,
            inbox_accumulator,
            confirm_data,
            stakers: BTreeSet::new(),
            child_staker_count: 0,
            latest_child: None,
            first_child_at: None,
            no_child_confirmed_before: None,
        }
    }

    pub fn id(&self) -> AssertionId {
        self.assertion.id
    }

    pub fn seq(&self) -> u64 {
        self.assertion.seq
    }

    pub fn is_pending(&self) -> bool {
        self.status == AssertionStatus::Pending
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == AssertionStatus::Confirmed
    }

    pub fn is_rejected(&self) -> bool {
        self.status == AssertionStatus::Rejected
    }

    pub fn has_staker(&self, staker: &Address) -> bool {
        self.stakers.contains(staker)
    }

    pub fn staker_count(&self) -> u64 {
        self.stakers.len() as u64
    }

    pub(crate) fn child_created(&mut self, child: AssertionId, deadline: BlockNumber, now: BlockNumber) {
        if self.first_child_at.is_none() {
            self.first_child_at = Some(now);
            self.no_child_confirmed_before = Some(deadline);
        }
        self.latest_child = Some(child);
    }

    /// Earliest height at which a child may be confirmed or rejected.
    pub fn child_confirm_ready_at(&self) -> Option<BlockNumber> {
        self.no_child_confirmed_before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::{GlobalState, MachineStatus};

    fn node() -> AssertionNode {
        let after = ExecutionState::new(
            GlobalState {
                block_hash: Bytes32::new([1; 32]),
                send_root: Bytes32::new([2; 32]),
                inbox_position: 1,
                position_in_message: 0,
            },
            MachineStatus::Finished,
        );
        AssertionNode::new(
            Assertion {
                id: AssertionId::new(Bytes32::new([9; 32])),
                parent_id: AssertionId::ZERO,
                seq: 1,
                before_state: ExecutionState::genesis(),
                after_state: after,
                num_steps: 4,
                inbox_max_count: 1,
                proposed_at: BlockNumber::new(10),
                deadline: BlockNumber::new(110),
                is_first_child: true,
            },
            Bytes32::ZERO,
            Bytes32::ZERO,
        )
    }

    #[test]
    fn confirm_data_binds_after_state() {
        let n = node();
        assert_eq!(
            n.confirm_data,
            vigil_crypto::confirm_data(&Bytes32::new([1; 32]), &Bytes32::new([2; 32]))
        );
        assert!(n.is_pending());
    }

    #[test]
    fn first_child_fixes_confirm_window() {
        let mut n = node();
        let a = AssertionId::new(Bytes32::new([3; 32]));
        let b = AssertionId::new(Bytes32::new([4; 32]));
        n.child_created(a, BlockNumber::new(200), BlockNumber::new(100));
        n.child_created(b, BlockNumber::new(330), BlockNumber::new(210));
        assert_eq!(n.latest_child, Some(b));
        assert_eq!(n.first_child_at, Some(BlockNumber::new(100)));
        assert_eq!(n.child_confirm_ready_at(), Some(BlockNumber::new(200)));
    }
}
