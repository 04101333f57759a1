//! The assertion chain aggregate: claim tree, confirmation pointer and the
//! permissionless confirm/reject cranks.
//!
//! Assertions live in an id-keyed table with explicit parent pointers and a
//! creation-ordered sequence index. `latest_confirmed` and `first_unresolved`
//! are sequence numbers; both only move forward, and every assertion between
//! them is resolved exactly once, in creation order.

use std::collections::{BTreeMap, BTreeSet};

use vigil_challenge::{ChallengeManager, GameEvent};
use vigil_types::{
    Address, Amount, AssertionId, BlockNumber, Bytes32, ChallengeId, Crank, MachineStatus,
    NotYet, RollupParams,
};

use crate::assertion::{Assertion, AssertionNode, AssertionStatus, NewAssertion};
use crate::error::RollupError;
use crate::event::RollupEvent;
use crate::inbox::Inbox;
use crate::staker::{Staker, Zombie};

/// Which creation checks apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Checks {
    /// Everything, including timing and minimum size.
    Staker,
    /// Content consistency only.
    Admin,
}

/// Outcome of validating a new assertion.
pub(crate) enum Prepared {
    /// Same parent and execution as an existing assertion.
    Existing(AssertionId),
    New(Box<AssertionNode>),
}

#[derive(Clone, Debug)]
pub struct AssertionChain {
    pub(crate) params: RollupParams,
    pub(crate) assertions: BTreeMap<AssertionId, AssertionNode>,
    pub(crate) by_seq: Vec<AssertionId>,
    /// `(parent, execution hash) -> id`, the idempotency index.
    pub(crate) by_content: BTreeMap<(AssertionId, Bytes32), AssertionId>,
    pub(crate) latest_confirmed: u64,
    pub(crate) first_unresolved: u64,
    pub(crate) stakers: BTreeMap<Address, Staker>,
    pub(crate) zombies: Vec<Zombie>,
    pub(crate) withdrawable: BTreeMap<Address, Amount>,
    pub(crate) validators: BTreeSet<Address>,
    pub(crate) whitelist_enabled: bool,
    pub(crate) paused: bool,
    pub(crate) game: ChallengeManager,
    pub(crate) pending_events: Vec<RollupEvent>,
}

impl AssertionChain {
    /// A chain holding only the confirmed genesis assertion.
    pub fn new(params: RollupParams) -> Result<Self, RollupError> {
        params.validate()?;
        let genesis_state = params.genesis_state;
        let execution_hash = vigil_crypto::execution_hash(&genesis_state, 0);
        let id = vigil_crypto::assertion_id(
            false,
            &AssertionId::ZERO,
            &execution_hash,
            &Bytes32::ZERO,
            &params.wasm_module_root,
        );
        let mut genesis = AssertionNode::new(
            Assertion {
                id,
                parent_id: AssertionId::ZERO,
                seq: 0,
                before_state: genesis_state,
                after_state: genesis_state,
                num_steps: 0,
                inbox_max_count: params.genesis_inbox_count,
                proposed_at: BlockNumber::GENESIS,
                deadline: BlockNumber::GENESIS,
                is_first_child: true,
            },
            execution_hash,
            Bytes32::ZERO,
        );
        genesis.status = AssertionStatus::Confirmed;

        let game = ChallengeManager::new(params.game);
        let mut assertions = BTreeMap::new();
        assertions.insert(id, genesis);
        Ok(Self {
            params,
            assertions,
            by_seq: vec![id],
            by_content: BTreeMap::new(),
            latest_confirmed: 0,
            first_unresolved: 1,
            stakers: BTreeMap::new(),
            zombies: Vec::new(),
            withdrawable: BTreeMap::new(),
            validators: BTreeSet::new(),
            whitelist_enabled: false,
            paused: false,
            game,
            pending_events: Vec::new(),
        })
    }

    // --- cranks ---

    /// Confirm the oldest unresolved assertion.
    ///
    /// It must be a child of the latest confirmed assertion, past its own
    /// deadline and past the parent's child-confirm window, backed by at least
    /// one live staker, and every live staker on any of its siblings must
    /// instead be staked on it.
    pub fn confirm_next_assertion(
        &mut self,
        sender: &Address,
        block_hash: Bytes32,
        send_root: Bytes32,
        now: BlockNumber,
    ) -> Result<Crank<AssertionId>, RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        self.require_caller_not_in_challenge(sender)?;
        let Some(id) = self.first_unresolved_id() else {
            tracing::debug!("confirm: nothing pending");
            return Ok(Crank::NotYet(NotYet::NothingPending));
        };
        let node = self.node_or_err(&id)?;
        let parent_id = node.assertion.parent_id;
        if parent_id != self.latest_confirmed() {
            return Err(RollupError::ParentNotConfirmed(id));
        }
        if !node.assertion.deadline.is_reached_at(now) {
            tracing::debug!(assertion = %id, deadline = %node.assertion.deadline, "confirm: before deadline");
            return Ok(Crank::NotYet(NotYet::BeforeDeadline {
                deadline: node.assertion.deadline,
            }));
        }
        let parent = self.node_or_err(&parent_id)?;
        if let Some(ready_at) = parent.no_child_confirmed_before {
            if !ready_at.is_reached_at(now) {
                tracing::debug!(assertion = %id, %ready_at, "confirm: child too recent");
                return Ok(Crank::NotYet(NotYet::ChildTooRecent { ready_at }));
            }
        }

        let staked_zombies = self.count_staked_zombies(&id);
        if node.staker_count() <= staked_zombies {
            return Err(RollupError::NoStakers);
        }
        let zombies_on_siblings = self.count_zombies_on_siblings(&id);
        if parent.child_staker_count != node.staker_count() + zombies_on_siblings {
            return Err(RollupError::NotAllStaked);
        }
        if vigil_crypto::confirm_data(&block_hash, &send_root) != node.confirm_data {
            return Err(RollupError::ConfirmDataMismatch(id));
        }

        self.remove_old_zombies_unchecked();
        self.mark_confirmed(&id, block_hash, send_root);
        Ok(Crank::Done(id))
    }

    /// Reject the oldest unresolved assertion.
    ///
    /// If its parent was rejected or a sibling was confirmed, it is rejected
    /// outright. Otherwise `staker` must be a live staker on a rival branch,
    /// the deadlines must have passed and only zombies may remain on it.
    pub fn reject_next_assertion(
        &mut self,
        sender: &Address,
        staker: &Address,
        now: BlockNumber,
    ) -> Result<Crank<AssertionId>, RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        self.require_caller_not_in_challenge(sender)?;
        let Some(id) = self.first_unresolved_id() else {
            tracing::debug!("reject: nothing pending");
            return Ok(Crank::NotYet(NotYet::NothingPending));
        };
        let node = self.node_or_err(&id)?;
        let parent_id = node.assertion.parent_id;

        if parent_id == self.latest_confirmed() {
            // A live staker whose latest stake is unresolved but not on this
            // assertion must be on a sibling branch.
            let record = self
                .stakers
                .get(staker)
                .ok_or(RollupError::NotStaked(*staker))?;
            let latest = self.node_or_err(&record.latest_staked)?;
            if !latest.is_pending() {
                return Err(RollupError::AlreadyResolved(record.latest_staked));
            }
            if node.has_staker(staker) {
                return Err(RollupError::StakedOnTarget(*staker));
            }
            if !node.assertion.deadline.is_reached_at(now) {
                tracing::debug!(assertion = %id, "reject: before deadline");
                return Ok(Crank::NotYet(NotYet::BeforeDeadline {
                    deadline: node.assertion.deadline,
                }));
            }
            let parent = self.node_or_err(&parent_id)?;
            if let Some(ready_at) = parent.no_child_confirmed_before {
                if !ready_at.is_reached_at(now) {
                    tracing::debug!(assertion = %id, %ready_at, "reject: child too recent");
                    return Ok(Crank::NotYet(NotYet::ChildTooRecent { ready_at }));
                }
            }
            if node.staker_count() != self.count_staked_zombies(&id) {
                return Err(RollupError::HasStakers);
            }
        }

        self.remove_old_zombies_unchecked();
        self.mark_rejected(&id);
        Ok(Crank::Done(id))
    }

    // --- queries ---

    pub fn params(&self) -> &RollupParams {
        &self.params
    }

    pub fn assertion(&self, id: &AssertionId) -> Option<&AssertionNode> {
        self.assertions.get(id)
    }

    pub fn assertion_by_seq(&self, seq: u64) -> Option<&AssertionNode> {
        let id = self.by_seq.get(usize::try_from(seq).ok()?)?;
        self.assertions.get(id)
    }

    pub fn genesis(&self) -> AssertionId {
        self.by_seq[0]
    }

    pub fn latest_confirmed(&self) -> AssertionId {
        self.id_at(self.latest_confirmed)
    }

    pub fn latest_confirmed_seq(&self) -> u64 {
        self.latest_confirmed
    }

    pub fn latest_created(&self) -> AssertionId {
        self.id_at(self.latest_created_seq())
    }

    pub fn latest_created_seq(&self) -> u64 {
        (self.by_seq.len() - 1) as u64
    }

    /// The next assertion to confirm or reject, if any.
    pub fn first_unresolved(&self) -> Option<&AssertionNode> {
        self.assertion_by_seq(self.first_unresolved)
    }

    pub fn first_unresolved_seq(&self) -> u64 {
        self.first_unresolved
    }

    pub fn assertion_count(&self) -> usize {
        self.by_seq.len()
    }

    /// Children of `id` in creation order.
    pub fn children_of(&self, id: &AssertionId) -> Vec<&AssertionNode> {
        let Some(parent) = self.assertions.get(id) else {
            return Vec::new();
        };
        self.by_seq[parent.seq() as usize + 1..]
            .iter()
            .filter_map(|c| self.assertions.get(c))
            .filter(|c| c.assertion.parent_id == *id)
            .collect()
    }

    pub fn staker(&self, address: &Address) -> Option<&Staker> {
        self.stakers.get(address)
    }

    pub fn stakers(&self) -> impl Iterator<Item = &Staker> {
        self.stakers.values()
    }

    pub fn is_staked(&self, address: &Address) -> bool {
        self.stakers.contains_key(address)
    }

    pub fn amount_staked(&self, address: &Address) -> Amount {
        self.stakers
            .get(address)
            .map(|s| s.amount_staked)
            .unwrap_or(Amount::ZERO)
    }

    pub fn total_staked(&self) -> Amount {
        self.stakers.values().map(|s| s.amount_staked).sum()
    }

    pub fn latest_staked_assertion(&self, address: &Address) -> Option<AssertionId> {
        self.stakers.get(address).map(|s| s.latest_staked)
    }

    pub fn current_challenge(&self, address: &Address) -> Option<ChallengeId> {
        self.stakers.get(address).and_then(|s| s.current_challenge)
    }

    pub fn staker_count(&self) -> usize {
        self.stakers.len()
    }

    pub fn withdrawable_funds(&self, owner: &Address) -> Amount {
        self.withdrawable.get(owner).copied().unwrap_or(Amount::ZERO)
    }

    pub fn total_withdrawable(&self) -> Amount {
        self.withdrawable.values().copied().sum()
    }

    pub fn zombies(&self) -> &[Zombie] {
        &self.zombies
    }

    pub fn zombie_count(&self) -> usize {
        self.zombies.len()
    }

    pub fn is_zombie(&self, address: &Address) -> bool {
        self.zombies.iter().any(|z| z.address == *address)
    }

    /// Zombies still counted among the stakers of `id`.
    pub fn count_staked_zombies(&self, id: &AssertionId) -> u64 {
        let Some(node) = self.assertions.get(id) else {
            return 0;
        };
        self.zombies
            .iter()
            .filter(|z| node.has_staker(&z.address))
            .count() as u64
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn whitelist_enabled(&self) -> bool {
        self.whitelist_enabled
    }

    pub fn is_validator(&self, address: &Address) -> bool {
        self.validators.contains(address)
    }

    pub fn challenges(&self) -> &ChallengeManager {
        &self.game
    }

    pub fn current_responder(&self, challenge: &ChallengeId) -> Option<Address> {
        self.game.current_responder(challenge)
    }

    pub fn is_timed_out(&self, challenge: &ChallengeId, now: BlockNumber) -> bool {
        self.game.is_timed_out(challenge, now)
    }

    pub fn drain_events(&mut self) -> Vec<RollupEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // --- guards ---

    pub(crate) fn require_not_paused(&self) -> Result<(), RollupError> {
        if self.paused {
            return Err(RollupError::Paused);
        }
        Ok(())
    }

    pub(crate) fn require_paused(&self) -> Result<(), RollupError> {
        if !self.paused {
            return Err(RollupError::NotPaused);
        }
        Ok(())
    }

    pub(crate) fn require_validator(&self, sender: &Address) -> Result<(), RollupError> {
        if self.whitelist_enabled && !self.validators.contains(sender) {
            return Err(RollupError::NotValidator(*sender));
        }
        Ok(())
    }

    pub(crate) fn require_admin(&self, sender: &Address) -> Result<(), RollupError> {
        if *sender != self.params.owner {
            return Err(RollupError::NotAdmin(*sender));
        }
        Ok(())
    }

    /// Staked and free to act.
    pub(crate) fn require_unchallenged_staker(
        &self,
        address: &Address,
    ) -> Result<&Staker, RollupError> {
        let staker = self
            .stakers
            .get(address)
            .ok_or(RollupError::NotStaked(*address))?;
        if staker.is_in_challenge() {
            return Err(RollupError::InChallenge(*address));
        }
        Ok(staker)
    }

    fn require_caller_not_in_challenge(&self, sender: &Address) -> Result<(), RollupError> {
        match self.stakers.get(sender) {
            Some(s) if s.is_in_challenge() => Err(RollupError::InChallenge(*sender)),
            _ => Ok(()),
        }
    }

    // --- internals ---

    pub(crate) fn node_or_err(&self, id: &AssertionId) -> Result<&AssertionNode, RollupError> {
        self.assertions
            .get(id)
            .ok_or(RollupError::UnknownAssertion(*id))
    }

    pub(crate) fn id_at(&self, seq: u64) -> AssertionId {
        self.by_seq
            .get(seq as usize)
            .copied()
            .unwrap_or(AssertionId::ZERO)
    }

    fn first_unresolved_id(&self) -> Option<AssertionId> {
        self.by_seq.get(self.first_unresolved as usize).copied()
    }

    pub(crate) fn emit(&mut self, event: RollupEvent) {
        self.pending_events.push(event);
    }

    pub(crate) fn forward_game_events(&mut self) {
        let events: Vec<GameEvent> = self.game.drain_events();
        self.pending_events
            .extend(events.into_iter().map(RollupEvent::Game));
    }

    /// Zombies staked on a sibling of `id`, i.e. on its parent's other children.
    fn count_zombies_on_siblings(&self, id: &AssertionId) -> u64 {
        let Some(node) = self.assertions.get(id) else {
            return 0;
        };
        self.children_of(&node.assertion.parent_id)
            .into_iter()
            .filter(|c| c.id() != *id)
            .map(|c| {
                self.zombies
                    .iter()
                    .filter(|z| c.has_staker(&z.address))
                    .count() as u64
            })
            .sum()
    }

    /// Assertions strictly after `from` down to and including `to`, or `None`
    /// if `to` does not descend from `from`.
    pub(crate) fn path_between(
        &self,
        from: &AssertionId,
        to: &AssertionId,
    ) -> Option<Vec<AssertionId>> {
        let from_seq = self.assertions.get(from)?.seq();
        let mut path = Vec::new();
        let mut cursor = *to;
        while cursor != *from {
            let node = self.assertions.get(&cursor)?;
            if node.seq() <= from_seq {
                return None;
            }
            path.push(cursor);
            cursor = node.assertion.parent_id;
        }
        path.reverse();
        Some(path)
    }

    pub(crate) fn add_staker_to(&mut self, id: &AssertionId, staker: &Address) {
        let Some(node) = self.assertions.get_mut(id) else {
            return;
        };
        if !node.stakers.insert(*staker) || node.seq() == 0 {
            return;
        }
        let parent_id = node.assertion.parent_id;
        if let Some(parent) = self.assertions.get_mut(&parent_id) {
            parent.child_staker_count += 1;
        }
    }

    pub(crate) fn remove_staker_from(&mut self, id: &AssertionId, staker: &Address) {
        let Some(node) = self.assertions.get_mut(id) else {
            return;
        };
        if !node.stakers.remove(staker) || node.seq() == 0 {
            return;
        }
        let parent_id = node.assertion.parent_id;
        if let Some(parent) = self.assertions.get_mut(&parent_id) {
            parent.child_staker_count = parent.child_staker_count.saturating_sub(1);
        }
    }

    /// Move `staker` down `path`, which must start right below its latest
    /// staked assertion.
    pub(crate) fn stake_along(&mut self, staker: &Address, path: &[AssertionId]) {
        let Some(target) = path.last().copied() else {
            return;
        };
        for id in path {
            self.add_staker_to(id, staker);
        }
        if let Some(record) = self.stakers.get_mut(staker) {
            record.latest_staked = target;
        }
        self.emit(RollupEvent::StakedOn {
            staker: *staker,
            assertion: target,
        });
    }

    /// Validate a new assertion against its parent and the inbox.
    pub(crate) fn prepare_assertion(
        &self,
        input: &NewAssertion,
        inbox: &dyn Inbox,
        now: BlockNumber,
        checks: Checks,
    ) -> Result<Prepared, RollupError> {
        let parent = self.node_or_err(&input.parent)?;
        if parent.is_rejected() {
            return Err(RollupError::Rejected(input.parent));
        }
        let before = &input.before_state;
        let after = &input.after_state;

        if checks == Checks::Staker {
            let elapsed = parent.assertion.proposed_at.elapsed_since(now);
            if elapsed < self.params.minimum_assertion_period {
                return Err(RollupError::TimeDelta {
                    elapsed,
                    required: self.params.minimum_assertion_period,
                });
            }
            if after.machine_status != MachineStatus::Errored
                && after.global_state.inbox_position < parent.assertion.inbox_max_count
            {
                return Err(RollupError::TooSmall {
                    position: after.global_state.inbox_position,
                    required: parent.assertion.inbox_max_count,
                });
            }
            if input.num_steps == 0 {
                return Err(RollupError::EmptyAssertion);
            }
            if before.machine_status != MachineStatus::Finished {
                return Err(RollupError::BadPrevStatus);
            }
        }

        if !matches!(
            after.machine_status,
            MachineStatus::Finished | MachineStatus::Errored
        ) {
            return Err(RollupError::BadAfterStatus);
        }
        if *before != parent.assertion.after_state {
            return Err(RollupError::PrevStateMismatch);
        }
        if after.global_state.compare_positions(&before.global_state) == std::cmp::Ordering::Less {
            return Err(RollupError::InboxBackwards);
        }
        let max = self.params.game.block_leaf_size;
        if input.num_steps > max {
            return Err(RollupError::TooManySteps {
                steps: input.num_steps,
                max,
            });
        }
        let required = after.required_messages();
        let available = inbox.max_count();
        if required > available {
            return Err(RollupError::InboxPastEnd {
                required,
                available,
            });
        }
        let inbox_accumulator = if required > 0 {
            inbox
                .accumulator(required - 1)
                .ok_or(RollupError::MissingAccumulator(required - 1))?
        } else {
            Bytes32::ZERO
        };

        let execution_hash = vigil_crypto::execution_hash(after, input.num_steps);
        if let Some(existing) = self.by_content.get(&(input.parent, execution_hash)) {
            return Ok(Prepared::Existing(*existing));
        }

        let has_sibling = parent.latest_child.is_some();
        let id = vigil_crypto::assertion_id(
            has_sibling,
            &input.parent,
            &execution_hash,
            &inbox_accumulator,
            &self.params.wasm_module_root,
        );
        if self.assertions.contains_key(&id) {
            return Err(RollupError::DuplicateAssertion(id));
        }
        let mut window = self.params.confirm_period_blocks;
        if has_sibling {
            window = window.saturating_add(self.params.extra_challenge_time_blocks);
        }
        let assertion = Assertion {
            id,
            parent_id: input.parent,
            seq: self.by_seq.len() as u64,
            before_state: *before,
            after_state: *after,
            num_steps: input.num_steps,
            inbox_max_count: available,
            proposed_at: now,
            deadline: now.saturating_add(window),
            is_first_child: !has_sibling,
        };
        Ok(Prepared::New(Box::new(AssertionNode::new(
            assertion,
            execution_hash,
            inbox_accumulator,
        ))))
    }

    /// Insert a validated assertion and link it under its parent.
    pub(crate) fn insert_assertion(&mut self, node: AssertionNode, now: BlockNumber) -> AssertionId {
        let id = node.id();
        let parent_id = node.assertion.parent_id;
        let deadline = node.assertion.deadline;
        if let Some(parent) = self.assertions.get_mut(&parent_id) {
            parent.child_created(id, deadline, now);
        }
        self.by_content.insert((parent_id, node.execution_hash), id);
        self.by_seq.push(id);
        self.emit(RollupEvent::AssertionCreated {
            assertion: node.assertion.clone(),
            inbox_accumulator: node.inbox_accumulator,
            inbox_max_count: node.assertion.inbox_max_count,
        });
        tracing::info!(
            assertion = %id,
            parent = %parent_id,
            seq = node.seq(),
            steps = node.assertion.num_steps,
            %deadline,
            "assertion created"
        );
        self.assertions.insert(id, node);
        id
    }

    pub(crate) fn mark_confirmed(&mut self, id: &AssertionId, block_hash: Bytes32, send_root: Bytes32) {
        let Some(node) = self.assertions.get_mut(id) else {
            return;
        };
        node.status = AssertionStatus::Confirmed;
        let seq = node.seq();
        self.latest_confirmed = seq;
        self.first_unresolved = seq + 1;
        self.emit(RollupEvent::AssertionConfirmed {
            id: *id,
            block_hash,
            send_root,
        });
        tracing::info!(assertion = %id, seq, "assertion confirmed");
    }

    pub(crate) fn mark_rejected(&mut self, id: &AssertionId) {
        let Some(node) = self.assertions.get_mut(id) else {
            return;
        };
        node.status = AssertionStatus::Rejected;
        let seq = node.seq();
        if self.first_unresolved == seq {
            self.first_unresolved = seq + 1;
        }
        self.emit(RollupEvent::AssertionRejected { id: *id });
        tracing::info!(assertion = %id, seq, "assertion rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    // --- genesis ---

    #[test]
    fn genesis_is_confirmed() {
        let chain = chain();
        let genesis = chain.assertion(&chain.genesis()).unwrap();
        assert!(genesis.is_confirmed());
        assert_eq!(chain.latest_confirmed(), chain.genesis());
        assert_eq!(chain.latest_created(), chain.genesis());
        assert!(chain.first_unresolved().is_none());
    }

    #[test]
    fn invalid_params_are_rejected() {
        let mut params = RollupParams::dev();
        params.confirm_period_blocks = 0;
        assert!(matches!(
            AssertionChain::new(params),
            Err(RollupError::Params(_))
        ));
    }

    // --- creation ---

    #[test]
    fn new_assertion_is_content_addressed() {
        let mut chain = chain();
        let inbox = inbox(4);
        let x = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox, 100).unwrap();
        let node = chain.assertion(&x).unwrap();
        assert_eq!(node.seq(), 1);
        assert_eq!(node.assertion.deadline, bn(200));
        assert!(node.assertion.is_first_child);
        assert!(node.has_staker(&addr(ALICE)));
        assert_eq!(chain.latest_created(), x);

        let genesis = chain.assertion(&chain.genesis()).unwrap();
        assert_eq!(genesis.child_staker_count, 1);
        assert_eq!(genesis.first_child_at, Some(bn(100)));
        assert_eq!(genesis.no_child_confirmed_before, Some(bn(200)));
    }

    #[test]
    fn resubmission_joins_existing_assertion() {
        let mut chain = chain();
        let inbox = inbox(4);
        let x = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox, 100).unwrap();
        let again = stake_new(&mut chain, BOB, state(0x01, 1), &inbox, 110).unwrap();
        assert_eq!(x, again);
        assert_eq!(chain.assertion_count(), 2);
        assert_eq!(chain.assertion(&x).unwrap().staker_count(), 2);
    }

    #[test]
    fn sibling_gets_extra_challenge_time() {
        let mut chain = chain();
        let inbox = inbox(4);
        stake_new(&mut chain, ALICE, state(0x01, 1), &inbox, 100).unwrap();
        let y = stake_new(&mut chain, BOB, state(0x02, 1), &inbox, 101).unwrap();
        let node = chain.assertion(&y).unwrap();
        assert!(!node.assertion.is_first_child);
        assert_eq!(node.assertion.deadline, bn(101 + 100 + 20));
    }

    #[test]
    fn assertion_too_soon_after_parent() {
        let mut chain = chain();
        let err = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox(4), 74).unwrap_err();
        assert!(matches!(err, RollupError::TimeDelta { elapsed: 74, required: 75 }));
        assert_eq!(chain.assertion_count(), 1);
        assert!(!chain.is_staked(&addr(ALICE)));
    }

    #[test]
    fn assertion_past_inbox_end() {
        let mut chain = chain();
        let err = stake_new(&mut chain, ALICE, state(0x01, 5), &inbox(4), 100).unwrap_err();
        assert!(matches!(err, RollupError::InboxPastEnd { required: 5, available: 4 }));
    }

    #[test]
    fn partially_read_message_counts_as_read() {
        let mut chain = chain();
        let mut after = state(0x01, 4);
        after.global_state.position_in_message = 1;
        let err = stake_new(&mut chain, ALICE, after, &inbox(4), 100).unwrap_err();
        assert!(matches!(err, RollupError::InboxPastEnd { required: 5, .. }));
    }

    #[test]
    fn child_must_read_what_parent_saw() {
        let mut chain = chain();
        let x = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox(4), 100).unwrap();
        let input = NewAssertion {
            parent: x,
            before_state: state(0x01, 1),
            after_state: state(0x03, 3),
            num_steps: 2,
        };
        let err = chain
            .stake_on_new_assertion(&addr(ALICE), input, None, &inbox(6), bn(200))
            .unwrap_err();
        assert!(matches!(err, RollupError::TooSmall { position: 3, required: 4 }));

        let mut errored = state(0x03, 3);
        errored.machine_status = MachineStatus::Errored;
        let input = NewAssertion {
            after_state: errored,
            ..input
        };
        assert!(chain
            .stake_on_new_assertion(&addr(ALICE), input, None, &inbox(6), bn(200))
            .is_ok());
    }

    #[test]
    fn content_checks() {
        let mut chain = chain();
        let genesis = chain.genesis();
        let base = NewAssertion {
            parent: genesis,
            before_state: chain.params().genesis_state,
            after_state: state(0x01, 1),
            num_steps: 4,
        };
        let stake = Some(Amount::new(10));

        let empty = NewAssertion { num_steps: 0, ..base };
        assert!(matches!(
            chain.stake_on_new_assertion(&addr(ALICE), empty, stake, &inbox(4), bn(100)),
            Err(RollupError::EmptyAssertion)
        ));

        let too_long = NewAssertion { num_steps: 33, ..base };
        assert!(matches!(
            chain.stake_on_new_assertion(&addr(ALICE), too_long, stake, &inbox(4), bn(100)),
            Err(RollupError::TooManySteps { steps: 33, max: 32 })
        ));

        let mut running = state(0x01, 1);
        running.machine_status = MachineStatus::Running;
        let bad_after = NewAssertion { after_state: running, ..base };
        assert!(matches!(
            chain.stake_on_new_assertion(&addr(ALICE), bad_after, stake, &inbox(4), bn(100)),
            Err(RollupError::BadAfterStatus)
        ));

        let wrong_prev = NewAssertion { before_state: state(0x09, 0), ..base };
        assert!(matches!(
            chain.stake_on_new_assertion(&addr(ALICE), wrong_prev, stake, &inbox(4), bn(100)),
            Err(RollupError::PrevStateMismatch)
        ));
        assert_eq!(chain.assertion_count(), 1);
        assert_eq!(chain.staker_count(), 0);
    }

    #[test]
    fn cannot_build_on_rejected_parent() {
        let mut chain = chain();
        let inbox = inbox(8);
        let x = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox, 100).unwrap();
        chain.assertions.get_mut(&x).unwrap().status = AssertionStatus::Rejected;
        let input = NewAssertion {
            parent: x,
            before_state: state(0x01, 1),
            after_state: state(0x02, 4),
            num_steps: 1,
        };
        let err = chain
            .stake_on_new_assertion(&addr(ALICE), input, None, &inbox, bn(200))
            .unwrap_err();
        assert!(matches!(err, RollupError::Rejected(id) if id == x));
    }

    // --- confirmation ---

    #[test]
    fn confirm_waits_for_deadline() {
        let mut chain = chain();
        let x = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox(4), 100).unwrap();
        let (bh, sr) = confirm_args(0x01);
        let r = chain.confirm_next_assertion(&addr(CAROL), bh, sr, bn(199)).unwrap();
        assert_eq!(r, Crank::NotYet(NotYet::BeforeDeadline { deadline: bn(200) }));

        let r = chain.confirm_next_assertion(&addr(CAROL), bh, sr, bn(200)).unwrap();
        assert_eq!(r, Crank::Done(x));
        assert_eq!(chain.latest_confirmed(), x);
        assert!(chain.assertion(&x).unwrap().is_confirmed());
        assert!(chain.first_unresolved().is_none());
    }

    #[test]
    fn confirm_with_nothing_pending() {
        let mut chain = chain();
        let (bh, sr) = confirm_args(0x01);
        let r = chain.confirm_next_assertion(&addr(CAROL), bh, sr, bn(500)).unwrap();
        assert_eq!(r, Crank::NotYet(NotYet::NothingPending));
    }

    #[test]
    fn confirm_data_must_match() {
        let mut chain = chain();
        let x = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox(4), 100).unwrap();
        let (bh, sr) = confirm_args(0x02);
        let err = chain.confirm_next_assertion(&addr(CAROL), bh, sr, bn(300)).unwrap_err();
        assert!(matches!(err, RollupError::ConfirmDataMismatch(id) if id == x));
        assert!(chain.assertion(&x).unwrap().is_pending());
    }

    #[test]
    fn confirm_blocked_by_live_sibling() {
        let mut chain = chain();
        let inbox = inbox(4);
        stake_new(&mut chain, ALICE, state(0x01, 1), &inbox, 100).unwrap();
        stake_new(&mut chain, BOB, state(0x02, 1), &inbox, 100).unwrap();
        let (bh, sr) = confirm_args(0x01);
        let err = chain.confirm_next_assertion(&addr(CAROL), bh, sr, bn(400)).unwrap_err();
        assert!(matches!(err, RollupError::NotAllStaked));
    }

    #[test]
    fn confirm_needs_a_staker() {
        let mut chain = chain();
        let inbox = inbox(4);
        let x = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox, 100).unwrap();
        chain.remove_staker_from(&x, &addr(ALICE));
        let (bh, sr) = confirm_args(0x01);
        let err = chain.confirm_next_assertion(&addr(CAROL), bh, sr, bn(400)).unwrap_err();
        assert!(matches!(err, RollupError::NoStakers));
    }

    #[test]
    fn confirm_respects_parent_child_window() {
        let mut chain = chain();
        let x = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox(4), 100).unwrap();
        let genesis = chain.genesis();
        chain.assertions.get_mut(&genesis).unwrap().no_child_confirmed_before = Some(bn(250));
        let (bh, sr) = confirm_args(0x01);
        let r = chain.confirm_next_assertion(&addr(CAROL), bh, sr, bn(200)).unwrap();
        assert_eq!(r, Crank::NotYet(NotYet::ChildTooRecent { ready_at: bn(250) }));
        let r = chain.confirm_next_assertion(&addr(CAROL), bh, sr, bn(250)).unwrap();
        assert_eq!(r, Crank::Done(x));
    }

    #[test]
    fn confirmation_advances_down_the_chain() {
        let mut chain = chain();
        let inbox = inbox(8);
        let x = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox, 100).unwrap();
        let child = NewAssertion {
            parent: x,
            before_state: state(0x01, 1),
            after_state: state(0x05, 8),
            num_steps: 3,
        };
        let z = chain
            .stake_on_new_assertion(&addr(ALICE), child, None, &inbox, bn(180))
            .unwrap();
        assert_eq!(chain.assertion(&z).unwrap().assertion.deadline, bn(280));

        // The child cannot jump the queue.
        let (bh, sr) = confirm_args(0x05);
        assert!(matches!(
            chain.confirm_next_assertion(&addr(CAROL), bh, sr, bn(200)),
            Err(RollupError::ConfirmDataMismatch(id)) if id == x
        ));

        let (bh, sr) = confirm_args(0x01);
        assert!(chain.confirm_next_assertion(&addr(CAROL), bh, sr, bn(200)).unwrap().is_done());
        let (bh, sr) = confirm_args(0x05);
        let r = chain.confirm_next_assertion(&addr(CAROL), bh, sr, bn(280)).unwrap();
        assert_eq!(r, Crank::Done(z));
        assert_eq!(chain.latest_confirmed(), z);
        assert_eq!(chain.latest_confirmed_seq(), 2);
    }

    // --- rejection ---

    #[test]
    fn reject_unstaked_sibling() {
        let mut chain = chain();
        let inbox = inbox(4);
        let x = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox, 100).unwrap();
        let y = stake_new(&mut chain, BOB, state(0x02, 1), &inbox, 100).unwrap();
        // Bob leaves Y without a live staker.
        chain.turn_into_zombie(&addr(BOB));

        let r = chain.reject_next_assertion(&addr(CAROL), &addr(BOB), bn(400));
        assert!(matches!(r, Err(RollupError::NotStaked(_))));

        // X is first: Alice is on it, so it cannot be rejected.
        let r = chain.reject_next_assertion(&addr(CAROL), &addr(ALICE), bn(400));
        assert!(matches!(r, Err(RollupError::StakedOnTarget(_))));

        let (bh, sr) = confirm_args(0x01);
        assert_eq!(
            chain.confirm_next_assertion(&addr(CAROL), bh, sr, bn(400)).unwrap(),
            Crank::Done(x)
        );
        // Y's parent is no longer the latest confirmed: rejected outright.
        assert_eq!(
            chain.reject_next_assertion(&addr(CAROL), &addr(CAROL), bn(400)).unwrap(),
            Crank::Done(y)
        );
        assert!(chain.assertion(&y).unwrap().is_rejected());
    }

    #[test]
    fn reject_requires_no_live_stakers() {
        let mut chain = chain();
        let inbox = inbox(4);
        stake_new(&mut chain, ALICE, state(0x01, 1), &inbox, 100).unwrap();
        stake_new(&mut chain, BOB, state(0x02, 1), &inbox, 100).unwrap();
        // X is first in line and Alice is live on it.
        let r = chain.reject_next_assertion(&addr(CAROL), &addr(BOB), bn(400));
        assert!(matches!(r, Err(RollupError::HasStakers)));
    }

    #[test]
    fn reject_zombie_backed_assertion() {
        let mut chain = chain();
        let inbox = inbox(4);
        let x = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox, 100).unwrap();
        let y = stake_new(&mut chain, BOB, state(0x02, 1), &inbox, 100).unwrap();
        chain.turn_into_zombie(&addr(ALICE));

        let r = chain.reject_next_assertion(&addr(CAROL), &addr(BOB), bn(150)).unwrap();
        assert_eq!(r, Crank::NotYet(NotYet::BeforeDeadline { deadline: bn(200) }));

        let r = chain.reject_next_assertion(&addr(CAROL), &addr(BOB), bn(200)).unwrap();
        assert_eq!(r, Crank::Done(x));
        assert_eq!(chain.first_unresolved().unwrap().id(), y);
    }

    // --- paths ---

    #[test]
    fn path_between_follows_parents() {
        let mut chain = chain();
        let inbox = inbox(8);
        let x = stake_new(&mut chain, ALICE, state(0x01, 1), &inbox, 100).unwrap();
        let input = NewAssertion {
            parent: x,
            before_state: state(0x01, 1),
            after_state: state(0x04, 8),
            num_steps: 3,
        };
        let z = chain
            .stake_on_new_assertion(&addr(ALICE), input, None, &inbox, bn(180))
            .unwrap();
        let genesis = chain.genesis();
        assert_eq!(chain.path_between(&genesis, &z), Some(vec![x, z]));
        assert_eq!(chain.path_between(&x, &z), Some(vec![z]));
        assert_eq!(chain.path_between(&z, &z), Some(vec![]));
        assert_eq!(chain.path_between(&z, &x), None);
        assert_eq!(chain.latest_staked_assertion(&addr(ALICE)), Some(z));
        assert_eq!(chain.assertion(&x).unwrap().child_staker_count, 1);
    }
}
