use thiserror::Error;

use vigil_types::{Address, BlockNumber, Bytes32, ChallengeId, EdgeId};

use crate::level::EdgeLevel;

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("unknown challenge {0}")]
    UnknownChallenge(ChallengeId),

    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),

    #[error("{0} is not active")]
    ChallengeNotActive(ChallengeId),

    #[error("a staker cannot challenge itself")]
    SelfChallenge,

    #[error("both sides claim the same end state")]
    NoDisagreement,

    #[error("range of {length} exceeds the {level} leaf size {max}")]
    RangeTooLarge {
        level: EdgeLevel,
        length: u64,
        max: u64,
    },

    #[error("{sender} is not the claimant of edge {edge}")]
    NotClaimant { edge: EdgeId, sender: Address },

    #[error("not your turn, waiting on {expected}")]
    NotYourTurn { expected: Address },

    #[error("edge {0} is not on the disputed frontier")]
    EdgeNotOnFrontier(EdgeId),

    #[error("edge {0} is not awaiting a move")]
    EdgeNotAwaited(EdgeId),

    #[error("edge deadline {deadline} has passed")]
    DeadlineExpired { deadline: BlockNumber },

    #[error("edge of length {length} cannot be bisected")]
    CannotBisect { length: u64 },

    #[error("invalid bisection: {0}")]
    BadBisection(String),

    #[error("edge {0} is not a one-step edge")]
    NotOneStep(EdgeId),

    #[error("duplicate edge {0}")]
    DuplicateEdge(EdgeId),

    #[error("one-step proof rejected: {0}")]
    InvalidProof(String),

    #[error("one-step result {computed} matches neither side of {challenge}")]
    AdjudicationFault {
        challenge: ChallengeId,
        computed: Bytes32,
    },
}
