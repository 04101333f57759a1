use thiserror::Error;

use vigil_challenge::ChallengeError;
use vigil_types::{Address, Amount, AssertionId, VigilError};

#[derive(Debug, Error)]
pub enum RollupError {
    // --- staking ---
    #[error("stake {provided} is below the required {required}")]
    TooLittleStake { provided: Amount, required: Amount },

    #[error("{0} is not staked")]
    NotStaked(Address),

    #[error("{0} is already staked")]
    AlreadyStaked(Address),

    #[error("{0} is in a challenge")]
    InChallenge(Address),

    #[error("{0} is a zombie")]
    StakerIsZombie(Address),

    #[error("{0} has no funds to withdraw")]
    NoFundsToWithdraw(Address),

    #[error("{staker} latest stake is not yet confirmed")]
    TooRecent { staker: Address },

    #[error("{target} does not descend from {staker}'s latest staked assertion")]
    NotOnPath { staker: Address, target: AssertionId },

    #[error("no zombie at {0}")]
    NoSuchZombie(Address),

    // --- assertion creation ---
    #[error("unknown assertion {0}")]
    UnknownAssertion(AssertionId),

    #[error("assertion {0} was rejected")]
    Rejected(AssertionId),

    #[error("assertion {0} is already resolved")]
    AlreadyResolved(AssertionId),

    #[error("only {elapsed} blocks since the parent was created, need {required}")]
    TimeDelta { elapsed: u64, required: u64 },

    #[error("assertion executes no steps")]
    EmptyAssertion,

    #[error("before-state is not finished")]
    BadPrevStatus,

    #[error("after-state must be finished or errored")]
    BadAfterStatus,

    #[error("before-state does not match the parent's after-state")]
    PrevStateMismatch,

    #[error("after-state reads {position} messages, parent saw {required}")]
    TooSmall { position: u64, required: u64 },

    #[error("assertion needs {required} messages, inbox has {available}")]
    InboxPastEnd { required: u64, available: u64 },

    #[error("after-state is behind the before-state in the inbox")]
    InboxBackwards,

    #[error("inbox has no accumulator at {0}")]
    MissingAccumulator(u64),

    #[error("{steps} steps exceed the block leaf size {max}")]
    TooManySteps { steps: u64, max: u64 },

    #[error("assertion {0} already exists")]
    DuplicateAssertion(AssertionId),

    // --- confirmation ---
    #[error("no staker backs the next assertion")]
    NoStakers,

    #[error("stakers remain on a sibling of the next assertion")]
    NotAllStaked,

    #[error("the next assertion still has stakers")]
    HasStakers,

    #[error("{0} is staked on the assertion being rejected")]
    StakedOnTarget(Address),

    #[error("parent of {0} is not the latest confirmed assertion")]
    ParentNotConfirmed(AssertionId),

    #[error("{0} is not the latest confirmed assertion")]
    NotLatestConfirmed(AssertionId),

    #[error("confirm data does not match assertion {0}")]
    ConfirmDataMismatch(AssertionId),

    // --- challenges ---
    #[error("assertions must be passed oldest first")]
    WrongOrder,

    #[error("assertions are not siblings")]
    NotSiblings,

    #[error("{staker} is not staked on {assertion}")]
    NotStakedOn {
        staker: Address,
        assertion: AssertionId,
    },

    #[error("{0} and {1} are not in a challenge together")]
    NotInChallenge(Address, Address),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    // --- admin ---
    #[error("chain is paused")]
    Paused,

    #[error("chain is not paused")]
    NotPaused,

    #[error("{0} is not the admin")]
    NotAdmin(Address),

    #[error("{0} is not a whitelisted validator")]
    NotValidator(Address),

    #[error("expected {expected} entries, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("empty list")]
    EmptyList,

    // --- snapshot ---
    #[error("unsupported snapshot version {0}")]
    SnapshotVersion(u32),

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error(transparent)]
    Params(#[from] VigilError),
}
