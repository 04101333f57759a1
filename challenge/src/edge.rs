//! Challenge edges: one side's claim over a range of steps.

use serde::{Deserialize, Serialize};

use vigil_types::{Address, BlockNumber, Bytes32, ChallengeId, EdgeId};

use crate::level::EdgeLevel;

/// Lifecycle of an edge.
///
/// `Pending -> Bisected | Escalated` while the game runs, and
/// `Confirmed | TimedOut | Refuted` once it is resolved. Edges are never
/// deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeStatus {
    Pending,
    /// Split into `lower_child` and `upper_child`.
    Bisected,
    /// A single step refined by a range at the next finer level.
    Escalated,
    Confirmed,
    /// The claimant failed to move before the deadline.
    TimedOut,
    /// The one-step verifier disagreed with the claimant.
    Refuted,
}

impl EdgeStatus {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Confirmed | Self::TimedOut | Self::Refuted)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub challenge_id: ChallengeId,
    pub level: EdgeLevel,
    pub start_height: u64,
    pub end_height: u64,
    pub start_commit: Bytes32,
    pub end_commit: Bytes32,
    pub claimant: Address,
    /// The edge this one is half of.
    pub parent: Option<EdgeId>,
    /// The coarser single-step edge this level-root refines.
    pub origin: Option<EdgeId>,
    pub lower_child: Option<EdgeId>,
    pub upper_child: Option<EdgeId>,
    pub created_at: BlockNumber,
    pub deadline: BlockNumber,
    pub status: EdgeStatus,
}

/// Position and claim of an edge that is about to be created.
pub(crate) struct EdgeSpec {
    pub level: EdgeLevel,
    pub start_height: u64,
    pub end_height: u64,
    pub start_commit: Bytes32,
    pub end_commit: Bytes32,
    pub claimant: Address,
    pub parent: Option<EdgeId>,
    pub origin: Option<EdgeId>,
}

impl Edge {
    pub(crate) fn new(
        challenge_id: ChallengeId,
        draft: EdgeSpec,
        now: BlockNumber,
        deadline: BlockNumber,
    ) -> Self {
        let mutual = vigil_crypto::mutual_id(
            challenge_id,
            draft.level.tag(),
            draft.start_height,
            draft.end_height,
            &draft.start_commit,
        );
        let id = vigil_crypto::edge_id(&mutual, &draft.end_commit, &draft.claimant);
        Self {
            id,
            challenge_id,
            level: draft.level,
            start_height: draft.start_height,
            end_height: draft.end_height,
            start_commit: draft.start_commit,
            end_commit: draft.end_commit,
            claimant: draft.claimant,
            parent: draft.parent,
            origin: draft.origin,
            lower_child: None,
            upper_child: None,
            created_at: now,
            deadline,
            status: EdgeStatus::Pending,
        }
    }

    pub fn length(&self) -> u64 {
        self.end_height - self.start_height
    }

    /// Identity shared with any rival.
    pub fn mutual_id(&self) -> Bytes32 {
        vigil_crypto::mutual_id(
            self.challenge_id,
            self.level.tag(),
            self.start_height,
            self.end_height,
            &self.start_commit,
        )
    }

    /// Same challenge, level, heights and start commitment, different end.
    pub fn is_rival_of(&self, other: &Edge) -> bool {
        self.challenge_id == other.challenge_id
            && self.level == other.level
            && self.start_height == other.start_height
            && self.end_height == other.end_height
            && self.start_commit == other.start_commit
            && self.end_commit != other.end_commit
    }

    pub fn is_pending(&self) -> bool {
        self.status == EdgeStatus::Pending
    }

    /// A single step at the finest level: decided by the one-step verifier.
    pub fn is_one_step(&self) -> bool {
        self.level.is_final() && self.length() == 1
    }
}
