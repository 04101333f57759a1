//! Events emitted by the challenge manager, carrying full payloads so an
//! off-chain observer can rebuild every edge.

use serde::{Deserialize, Serialize};

use vigil_types::{Bytes32, ChallengeId, EdgeId};

use crate::edge::Edge;
use crate::level::EdgeLevel;
use crate::manager::{ChallengeOutcome, Participant};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    ChallengeCreated {
        challenge_id: ChallengeId,
        challenger: Participant,
        asserter: Participant,
        start_commit: Bytes32,
        num_steps: u64,
    },
    EdgeAdded {
        edge: Edge,
    },
    EdgeBisected {
        edge_id: EdgeId,
        lower: EdgeId,
        upper: EdgeId,
        mid_commit: Bytes32,
    },
    LevelEscalated {
        challenge_id: ChallengeId,
        from: EdgeLevel,
        to: EdgeLevel,
    },
    ChallengeResolved {
        outcome: ChallengeOutcome,
    },
    ChallengeCancelled {
        challenge_id: ChallengeId,
    },
}
