use serde::{Deserialize, Serialize};

use vigil_types::{Address, Amount, AssertionId, ChallengeId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staker {
    pub address: Address,
    pub amount_staked: Amount,
    pub latest_staked: AssertionId,
    pub current_challenge: Option<ChallengeId>,
}

impl Staker {
    pub fn is_in_challenge(&self) -> bool {
        self.current_challenge.is_some()
    }
}

/// A staker that lost a challenge or was refunded by the admin. Its stake is
/// gone, but it still counts as staked on every assertion of its old path
/// until removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zombie {
    pub address: Address,
    /// Deepest assertion the zombie still counts as staked on.
    pub latest_staked: AssertionId,
}
