//! Fixtures shared by the unit tests of this crate.

use vigil_types::{
    Address, Amount, AssertionId, BlockNumber, Bytes32, ExecutionState, GlobalState,
    MachineStatus, RollupParams,
};

use crate::assertion::NewAssertion;
use crate::chain::AssertionChain;
use crate::error::RollupError;
use crate::inbox::Inbox;

pub const ALICE: u8 = 0xa1;
pub const BOB: u8 = 0xb0;
pub const CAROL: u8 = 0xc0;

pub fn addr(tag: u8) -> Address {
    Address::new([tag; 20])
}

pub fn bn(height: u64) -> BlockNumber {
    BlockNumber::new(height)
}

pub fn chain() -> AssertionChain {
    AssertionChain::new(RollupParams::dev()).unwrap()
}

pub struct TestInbox {
    count: u64,
}

impl Inbox for TestInbox {
    fn max_count(&self) -> u64 {
        self.count
    }

    fn accumulator(&self, index: u64) -> Option<Bytes32> {
        (index < self.count).then(|| Bytes32::new([index as u8 + 1; 32]))
    }
}

pub fn inbox(count: u64) -> TestInbox {
    TestInbox { count }
}

/// A finished state at inbox `position`, tagged by `byte`.
pub fn state(byte: u8, position: u64) -> ExecutionState {
    let (block_hash, send_root) = confirm_args(byte);
    ExecutionState::new(
        GlobalState {
            block_hash,
            send_root,
            inbox_position: position,
            position_in_message: 0,
        },
        MachineStatus::Finished,
    )
}

/// Block hash and send root of `state(byte, _)`.
pub fn confirm_args(byte: u8) -> (Bytes32, Bytes32) {
    (Bytes32::new([byte; 32]), Bytes32::new([!byte; 32]))
}

pub fn first_child(chain: &AssertionChain, after: ExecutionState) -> NewAssertion {
    NewAssertion {
        parent: chain.genesis(),
        before_state: chain.params().genesis_state,
        after_state: after,
        num_steps: 4,
    }
}

/// Stake `who` on a child of genesis, depositing the base stake if needed.
pub fn stake_new(
    chain: &mut AssertionChain,
    who: u8,
    after: ExecutionState,
    inbox: &TestInbox,
    now: u64,
) -> Result<AssertionId, RollupError> {
    let input = first_child(chain, after);
    let deposit = (!chain.is_staked(&addr(who))).then_some(Amount::new(10));
    chain.stake_on_new_assertion(&addr(who), input, deposit, inbox, bn(now))
}

/// Stake `who` (already staked above `parent`) on a new child of `parent`.
pub fn extend(
    chain: &mut AssertionChain,
    who: u8,
    parent: AssertionId,
    before: ExecutionState,
    after: ExecutionState,
    inbox: &TestInbox,
    now: u64,
) -> Result<AssertionId, RollupError> {
    let input = NewAssertion {
        parent,
        before_state: before,
        after_state: after,
        num_steps: 3,
    };
    chain.stake_on_new_assertion(&addr(who), input, None, inbox, bn(now))
}
