//! Deposits, stake placement and zombie cleanup.

use vigil_types::{Address, Amount, AssertionId, BlockNumber};

use crate::assertion::NewAssertion;
use crate::chain::{AssertionChain, Checks, Prepared};
use crate::error::RollupError;
use crate::event::RollupEvent;
use crate::inbox::Inbox;
use crate::staker::{Staker, Zombie};

/// `2^(i/10)` as fractions, for the tenth-of-a-period steps of the stake curve.
const NUMERATORS: [u128; 10] = [
    1, 122971, 128977, 80017, 207329, 114243, 314252, 129988, 248495, 122639,
];
const DENOMINATORS: [u128; 10] = [
    1, 114736, 112281, 64994, 157126, 80782, 207329, 80017, 147620, 68889,
];

/// Stake required from a new staker.
///
/// `base` until `deadline` (the first unresolved assertion's), then roughly
/// doubling every `confirm_period` blocks after it, saturating at `u128::MAX`.
pub fn required_stake(
    base: Amount,
    confirm_period: u64,
    deadline: Option<BlockNumber>,
    now: BlockNumber,
) -> Amount {
    let Some(deadline) = deadline else {
        return base;
    };
    if !deadline.is_reached_at(now) || confirm_period == 0 {
        return base;
    }
    let age = u128::from(deadline.elapsed_since(now));
    let periods = age.saturating_mul(10) / u128::from(confirm_period);
    let step = (periods % 10) as usize;
    let multiplier = u32::try_from(periods / 10)
        .ok()
        .and_then(|exp| 1u128.checked_shl(exp))
        .and_then(|m| m.checked_mul(NUMERATORS[step]))
        .map(|m| (m / DENOMINATORS[step]).max(1));
    match multiplier {
        Some(m) => base.saturating_mul(m),
        None => Amount::new(u128::MAX),
    }
}

impl AssertionChain {
    /// Stake required at `now` from anyone placing or keeping a stake.
    pub fn current_required_stake(&self, now: BlockNumber) -> Amount {
        let deadline = self.first_unresolved().map(|n| n.assertion.deadline);
        required_stake(
            self.params.base_stake,
            self.params.confirm_period_blocks,
            deadline,
            now,
        )
    }

    /// Create an assertion (or join the identical one) and stake on it.
    ///
    /// An existing staker passes `new_stake: None` and must already be staked
    /// on `input.parent` or one of its ancestors. A new staker passes its
    /// deposit and starts from the latest confirmed assertion.
    pub fn stake_on_new_assertion(
        &mut self,
        sender: &Address,
        input: NewAssertion,
        new_stake: Option<Amount>,
        inbox: &dyn Inbox,
        now: BlockNumber,
    ) -> Result<AssertionId, RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        let origin = self.stake_origin(sender, new_stake, now)?;

        let (target, node) = match self.prepare_assertion(&input, inbox, now, Checks::Staker)? {
            Prepared::Existing(id) => {
                let existing = self.node_or_err(&id)?;
                if existing.has_staker(sender) {
                    return Ok(id);
                }
                if !existing.is_pending() {
                    return Err(RollupError::AlreadyResolved(id));
                }
                (id, None)
            }
            Prepared::New(node) => (input.parent, Some(node)),
        };
        let mut path = self
            .path_between(&origin, &target)
            .ok_or(RollupError::NotOnPath {
                staker: *sender,
                target,
            })?;

        if let Some(amount) = new_stake {
            self.create_staker(sender, amount, origin);
        }
        if let Some(node) = node {
            path.push(self.insert_assertion(*node, now));
        }
        let id = path.last().copied().unwrap_or(target);
        self.stake_along(sender, &path);
        Ok(id)
    }

    /// Become a staker directly on an existing assertion.
    pub fn new_stake_on_existing_assertion(
        &mut self,
        sender: &Address,
        id: &AssertionId,
        amount: Amount,
        now: BlockNumber,
    ) -> Result<(), RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        let origin = self.stake_origin(sender, Some(amount), now)?;
        let path = self.pending_path(sender, &origin, id)?;
        self.create_staker(sender, amount, origin);
        self.stake_along(sender, &path);
        Ok(())
    }

    /// Move an existing stake down to a descendant of its latest assertion.
    pub fn stake_on_existing_assertion(
        &mut self,
        sender: &Address,
        id: &AssertionId,
        now: BlockNumber,
    ) -> Result<(), RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        let origin = self.stake_origin(sender, None, now)?;
        if origin == *id {
            return Ok(());
        }
        let path = self.pending_path(sender, &origin, id)?;
        self.stake_along(sender, &path);
        Ok(())
    }

    pub fn add_to_deposit(
        &mut self,
        sender: &Address,
        staker: &Address,
        amount: Amount,
    ) -> Result<(), RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        self.require_unchallenged_staker(staker)?;
        let Some(record) = self.stakers.get_mut(staker) else {
            return Err(RollupError::NotStaked(*staker));
        };
        record.amount_staked = record.amount_staked.saturating_add(amount);
        let total = record.amount_staked;
        self.emit(RollupEvent::StakeAdded {
            staker: *staker,
            amount,
            total,
        });
        Ok(())
    }

    /// Lower the sender's stake to `target`, never below the current
    /// requirement. The difference becomes withdrawable.
    pub fn reduce_deposit(
        &mut self,
        sender: &Address,
        target: Amount,
        now: BlockNumber,
    ) -> Result<Amount, RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        let current = self.require_unchallenged_staker(sender)?.amount_staked;
        let target = target.max(self.current_required_stake(now));
        if target > current {
            return Err(RollupError::TooLittleStake {
                provided: current,
                required: target,
            });
        }
        let refund = current - target;
        if let Some(record) = self.stakers.get_mut(sender) {
            record.amount_staked = target;
        }
        self.credit_withdrawable(sender, refund);
        self.emit(RollupEvent::StakeReduced {
            staker: *sender,
            amount: refund,
            total: target,
        });
        Ok(refund)
    }

    /// Release the whole deposit of a staker whose latest assertion is
    /// already confirmed (or older).
    pub fn return_old_deposit(
        &mut self,
        sender: &Address,
        staker: &Address,
    ) -> Result<Amount, RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        let record = self
            .stakers
            .get(staker)
            .ok_or(RollupError::NotStaked(*staker))?;
        let latest_seq = self.node_or_err(&record.latest_staked)?.seq();
        if latest_seq > self.latest_confirmed {
            return Err(RollupError::TooRecent { staker: *staker });
        }
        self.require_unchallenged_staker(staker)?;

        let amount = self
            .stakers
            .remove(staker)
            .map(|s| s.amount_staked)
            .unwrap_or(Amount::ZERO);
        self.credit_withdrawable(staker, amount);
        self.emit(RollupEvent::StakeReturned {
            staker: *staker,
            amount,
        });
        tracing::info!(%staker, %amount, "stake returned");
        Ok(amount)
    }

    /// Pay out everything credited to `sender`. Works while paused.
    pub fn withdraw_staker_funds(&mut self, sender: &Address) -> Result<Amount, RollupError> {
        let amount = self
            .withdrawable
            .remove(sender)
            .filter(|a| !a.is_zero())
            .ok_or(RollupError::NoFundsToWithdraw(*sender))?;
        self.emit(RollupEvent::FundsWithdrawn {
            owner: *sender,
            amount,
        });
        Ok(amount)
    }

    /// Strip up to `max_assertions` of a zombie's memberships, deepest first.
    /// The zombie record goes once its walk reaches the latest confirmed
    /// assertion.
    pub fn remove_zombie(
        &mut self,
        sender: &Address,
        zombie: &Address,
        max_assertions: u64,
    ) -> Result<(), RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        let index = self
            .zombies
            .iter()
            .position(|z| z.address == *zombie)
            .ok_or(RollupError::NoSuchZombie(*zombie))?;

        let mut cursor = Some(self.zombies[index].latest_staked);
        let mut removed = 0;
        while removed < max_assertions {
            let Some(node) = cursor.and_then(|id| self.assertions.get(&id)) else {
                break;
            };
            if node.seq() <= self.latest_confirmed {
                break;
            }
            let id = node.id();
            let parent = node.assertion.parent_id;
            self.remove_staker_from(&id, zombie);
            cursor = Some(parent);
            removed += 1;
        }

        let finished = cursor
            .and_then(|id| self.assertions.get(&id))
            .map_or(true, |n| n.seq() <= self.latest_confirmed);
        match (finished, cursor) {
            (false, Some(id)) => self.zombies[index].latest_staked = id,
            _ => {
                self.zombies.remove(index);
                self.emit(RollupEvent::ZombieRemoved { staker: *zombie });
            }
        }
        tracing::debug!(%zombie, removed, finished, "zombie pruned");
        Ok(())
    }

    /// Drop every zombie whose path lies entirely behind the latest confirmed
    /// assertion. Returns how many went.
    pub fn remove_old_zombies(&mut self, sender: &Address) -> Result<usize, RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        Ok(self.remove_old_zombies_unchecked())
    }

    pub(crate) fn remove_old_zombies_unchecked(&mut self) -> usize {
        let latest_confirmed = self.latest_confirmed;
        let assertions = &self.assertions;
        let (old, live): (Vec<Zombie>, Vec<Zombie>) =
            std::mem::take(&mut self.zombies).into_iter().partition(|z| {
                assertions
                    .get(&z.latest_staked)
                    .map_or(true, |n| n.seq() < latest_confirmed)
            });
        self.zombies = live;
        for zombie in &old {
            self.emit(RollupEvent::ZombieRemoved {
                staker: zombie.address,
            });
        }
        old.len()
    }

    /// Remove `address` from the staker table, keeping its memberships as a zombie.
    pub(crate) fn turn_into_zombie(&mut self, address: &Address) {
        let Some(staker) = self.stakers.remove(address) else {
            return;
        };
        self.zombies.push(Zombie {
            address: *address,
            latest_staked: staker.latest_staked,
        });
        self.emit(RollupEvent::ZombieCreated {
            staker: *address,
            latest_staked: staker.latest_staked,
        });
        tracing::info!(staker = %address, latest = %staker.latest_staked, "staker became a zombie");
    }

    pub(crate) fn credit_withdrawable(&mut self, owner: &Address, amount: Amount) {
        if amount.is_zero() {
            return;
        }
        let entry = self.withdrawable.entry(*owner).or_insert(Amount::ZERO);
        *entry = entry.saturating_add(amount);
    }

    /// The assertion a stake operation starts from, after checking the
    /// sender may stake at all.
    fn stake_origin(
        &self,
        sender: &Address,
        new_stake: Option<Amount>,
        now: BlockNumber,
    ) -> Result<AssertionId, RollupError> {
        let required = self.current_required_stake(now);
        match (self.stakers.get(sender), new_stake) {
            (Some(_), Some(_)) => Err(RollupError::AlreadyStaked(*sender)),
            (Some(staker), None) => {
                if staker.is_in_challenge() {
                    return Err(RollupError::InChallenge(*sender));
                }
                if staker.amount_staked < required {
                    return Err(RollupError::TooLittleStake {
                        provided: staker.amount_staked,
                        required,
                    });
                }
                Ok(staker.latest_staked)
            }
            (None, Some(amount)) => {
                if self.is_zombie(sender) {
                    return Err(RollupError::StakerIsZombie(*sender));
                }
                if amount < required {
                    return Err(RollupError::TooLittleStake {
                        provided: amount,
                        required,
                    });
                }
                Ok(self.latest_confirmed())
            }
            (None, None) => Err(RollupError::NotStaked(*sender)),
        }
    }

    /// Path from `origin` to a pending `target`.
    fn pending_path(
        &self,
        sender: &Address,
        origin: &AssertionId,
        target: &AssertionId,
    ) -> Result<Vec<AssertionId>, RollupError> {
        let node = self.node_or_err(target)?;
        if !node.is_pending() {
            return Err(RollupError::AlreadyResolved(*target));
        }
        self.path_between(origin, target)
            .filter(|p| !p.is_empty())
            .ok_or(RollupError::NotOnPath {
                staker: *sender,
                target: *target,
            })
    }

    fn create_staker(&mut self, address: &Address, amount: Amount, origin: AssertionId) {
        self.stakers.insert(
            *address,
            Staker {
                address: *address,
                amount_staked: amount,
                latest_staked: origin,
                current_challenge: None,
            },
        );
        self.emit(RollupEvent::StakeCreated {
            staker: *address,
            amount,
        });
        tracing::info!(staker = %address, %amount, "stake created");
    }
}
