//! Events emitted by the assertion chain.
//!
//! Payloads are complete: an observer that sees every event can rebuild the
//! claim tree, every stake and every challenge edge without reading chain
//! state.

use serde::{Deserialize, Serialize};

use vigil_challenge::GameEvent;
use vigil_types::{Address, Amount, AssertionId, Bytes32, ChallengeId};

use crate::assertion::Assertion;

/// Admin operation recorded by [`RollupEvent::AdminAction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminOp {
    SetValidators,
    SetWhitelistEnabled,
    ForceResolveChallenge,
    ForceRefundStaker,
    ForceCreateAssertion,
    ForceConfirmAssertion,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollupEvent {
    AssertionCreated {
        assertion: Assertion,
        inbox_accumulator: Bytes32,
        inbox_max_count: u64,
    },
    AssertionConfirmed {
        id: AssertionId,
        block_hash: Bytes32,
        send_root: Bytes32,
    },
    AssertionRejected {
        id: AssertionId,
    },
    StakeCreated {
        staker: Address,
        amount: Amount,
    },
    /// `staker` moved onto `assertion`.
    StakedOn {
        staker: Address,
        assertion: AssertionId,
    },
    StakeAdded {
        staker: Address,
        amount: Amount,
        total: Amount,
    },
    StakeReduced {
        staker: Address,
        amount: Amount,
        total: Amount,
    },
    StakeReturned {
        staker: Address,
        amount: Amount,
    },
    FundsWithdrawn {
        owner: Address,
        amount: Amount,
    },
    ChallengeStarted {
        challenge_id: ChallengeId,
        challenger: Address,
        asserter: Address,
        challenged: AssertionId,
    },
    /// `challenge_id` is `None` when a late sibling lost without a game.
    ChallengeResolved {
        challenge_id: Option<ChallengeId>,
        winner: Address,
        loser: Address,
    },
    Game(GameEvent),
    ZombieCreated {
        staker: Address,
        latest_staked: AssertionId,
    },
    ZombieRemoved {
        staker: Address,
    },
    Paused,
    Resumed,
    AdminAction {
        op: AdminOp,
    },
}
