//! Chain snapshots: the complete state of an [`AssertionChain`] in one
//! serializable value, so a node can persist it and resume after a restart.
//!
//! The hash is Blake2b-256 over the bincode encoding of the body and is
//! checked again on restore.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use vigil_challenge::ChallengeManager;
use vigil_types::{Address, Amount, Bytes32, RollupParams};

use crate::assertion::{AssertionNode, AssertionStatus};
use crate::chain::AssertionChain;
use crate::error::RollupError;
use crate::staker::{Staker, Zombie};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub version: u32,
    /// Blake2b-256 of the bincode-encoded body.
    pub hash: Bytes32,
    pub body: SnapshotBody,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotBody {
    pub params: RollupParams,
    /// Every assertion, genesis first, in creation order.
    pub assertions: Vec<AssertionNode>,
    pub latest_confirmed: u64,
    pub first_unresolved: u64,
    pub stakers: Vec<Staker>,
    pub zombies: Vec<Zombie>,
    pub withdrawable: Vec<(Address, Amount)>,
    pub validators: Vec<Address>,
    pub whitelist_enabled: bool,
    pub paused: bool,
    pub game: ChallengeManager,
}

impl ChainSnapshot {
    fn compute_hash(body: &SnapshotBody) -> Result<Bytes32, RollupError> {
        let bytes =
            bincode::serialize(body).map_err(|e| RollupError::CorruptSnapshot(e.to_string()))?;
        Ok(Bytes32::new(vigil_crypto::blake2b_256(&bytes)))
    }

    pub fn verify(&self) -> bool {
        matches!(Self::compute_hash(&self.body), Ok(h) if h == self.hash)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RollupError> {
        bincode::serialize(self).map_err(|e| RollupError::CorruptSnapshot(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RollupError> {
        bincode::deserialize(bytes).map_err(|e| RollupError::CorruptSnapshot(e.to_string()))
    }

    pub fn assertion_count(&self) -> usize {
        self.body.assertions.len()
    }
}

impl AssertionChain {
    /// Capture the whole chain. Undrained events are not part of it.
    pub fn snapshot(&self) -> Result<ChainSnapshot, RollupError> {
        let assertions = self
            .by_seq
            .iter()
            .map(|id| self.node_or_err(id).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        let body = SnapshotBody {
            params: self.params.clone(),
            assertions,
            latest_confirmed: self.latest_confirmed,
            first_unresolved: self.first_unresolved,
            stakers: self.stakers.values().cloned().collect(),
            zombies: self.zombies.clone(),
            withdrawable: self.withdrawable.iter().map(|(a, v)| (*a, *v)).collect(),
            validators: self.validators.iter().copied().collect(),
            whitelist_enabled: self.whitelist_enabled,
            paused: self.paused,
            game: self.game.clone(),
        };
        Ok(ChainSnapshot {
            version: SNAPSHOT_VERSION,
            hash: ChainSnapshot::compute_hash(&body)?,
            body,
        })
    }

    /// Rebuild a chain from a snapshot, checking its hash and internal
    /// consistency first.
    pub fn restore(snapshot: ChainSnapshot) -> Result<Self, RollupError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(RollupError::SnapshotVersion(snapshot.version));
        }
        if !snapshot.verify() {
            return Err(RollupError::CorruptSnapshot("hash mismatch".into()));
        }
        let body = snapshot.body;
        body.params.validate()?;

        let corrupt = |msg: &str| RollupError::CorruptSnapshot(msg.to_string());
        match body.assertions.first() {
            Some(genesis) if genesis.status == AssertionStatus::Confirmed => {}
            _ => return Err(corrupt("missing confirmed genesis")),
        }
        let count = body.assertions.len() as u64;
        if body.latest_confirmed >= count
            || body.first_unresolved > count
            || body.first_unresolved <= body.latest_confirmed
        {
            return Err(corrupt("confirmation pointers out of range"));
        }

        let mut assertions = BTreeMap::new();
        let mut by_seq = Vec::with_capacity(body.assertions.len());
        let mut by_content = BTreeMap::new();
        for (index, node) in body.assertions.into_iter().enumerate() {
            if node.seq() != index as u64 {
                return Err(corrupt("assertions out of sequence"));
            }
            let id = node.id();
            if index > 0 {
                if !assertions.contains_key(&node.assertion.parent_id) {
                    return Err(corrupt("assertion precedes its parent"));
                }
                by_content.insert((node.assertion.parent_id, node.execution_hash), id);
            }
            by_seq.push(id);
            if assertions.insert(id, node).is_some() {
                return Err(corrupt("duplicate assertion id"));
            }
        }

        let mut stakers = BTreeMap::new();
        for staker in body.stakers {
            if !assertions.contains_key(&staker.latest_staked) {
                return Err(corrupt("staker on unknown assertion"));
            }
            stakers.insert(staker.address, staker);
        }

        Ok(Self {
            params: body.params,
            assertions,
            by_seq,
            by_content,
            latest_confirmed: body.latest_confirmed,
            first_unresolved: body.first_unresolved,
            stakers,
            zombies: body.zombies,
            withdrawable: body.withdrawable.into_iter().collect(),
            validators: body.validators.into_iter().collect::<BTreeSet<_>>(),
            whitelist_enabled: body.whitelist_enabled,
            paused: body.paused,
            game: body.game,
            pending_events: Vec::new(),
        })
    }
}
