//! Owner-only controls: pause, the validator whitelist and the force paths
//! used to recover a paused chain.

use vigil_types::{Address, Amount, AssertionId, BlockNumber, Bytes32};

use crate::assertion::NewAssertion;
use crate::chain::{AssertionChain, Checks, Prepared};
use crate::error::RollupError;
use crate::event::{AdminOp, RollupEvent};
use crate::inbox::Inbox;

impl AssertionChain {
    pub fn pause(&mut self, sender: &Address) -> Result<(), RollupError> {
        self.require_admin(sender)?;
        self.require_not_paused()?;
        self.paused = true;
        self.emit(RollupEvent::Paused);
        tracing::info!("chain paused");
        Ok(())
    }

    pub fn resume(&mut self, sender: &Address) -> Result<(), RollupError> {
        self.require_admin(sender)?;
        self.require_paused()?;
        self.paused = false;
        self.emit(RollupEvent::Resumed);
        tracing::info!("chain resumed");
        Ok(())
    }

    /// Add (`true`) or remove (`false`) each address from the whitelist.
    pub fn set_validators(
        &mut self,
        sender: &Address,
        addresses: &[Address],
        allowed: &[bool],
    ) -> Result<(), RollupError> {
        self.require_admin(sender)?;
        if addresses.len() != allowed.len() {
            return Err(RollupError::WrongLength {
                expected: addresses.len(),
                actual: allowed.len(),
            });
        }
        for (address, allow) in addresses.iter().zip(allowed) {
            if *allow {
                self.validators.insert(*address);
            } else {
                self.validators.remove(address);
            }
        }
        self.admin_action(AdminOp::SetValidators);
        Ok(())
    }

    pub fn set_whitelist_enabled(&mut self, sender: &Address, enabled: bool) -> Result<(), RollupError> {
        self.require_admin(sender)?;
        self.whitelist_enabled = enabled;
        self.admin_action(AdminOp::SetWhitelistEnabled);
        Ok(())
    }

    /// Cancel the challenges between each `stakers_a[i]` and `stakers_b[i]`
    /// without a winner. Every pair is checked before any is touched.
    pub fn force_resolve_challenge(
        &mut self,
        sender: &Address,
        stakers_a: &[Address],
        stakers_b: &[Address],
    ) -> Result<(), RollupError> {
        self.require_admin(sender)?;
        self.require_paused()?;
        if stakers_a.is_empty() {
            return Err(RollupError::EmptyList);
        }
        if stakers_a.len() != stakers_b.len() {
            return Err(RollupError::WrongLength {
                expected: stakers_a.len(),
                actual: stakers_b.len(),
            });
        }
        let mut challenges = Vec::with_capacity(stakers_a.len());
        for (a, b) in stakers_a.iter().zip(stakers_b) {
            let id_a = self.stakers.get(a).and_then(|s| s.current_challenge);
            let id_b = self.stakers.get(b).and_then(|s| s.current_challenge);
            match (id_a, id_b) {
                (Some(x), Some(y)) if x == y && !challenges.contains(&x) => challenges.push(x),
                _ => return Err(RollupError::NotInChallenge(*a, *b)),
            }
        }

        for (id, (a, b)) in challenges.iter().zip(stakers_a.iter().zip(stakers_b)) {
            for staker in [a, b] {
                if let Some(record) = self.stakers.get_mut(staker) {
                    record.current_challenge = None;
                }
            }
            self.game.cancel(id)?;
            tracing::warn!(challenge = %id, staker_a = %a, staker_b = %b, "challenge force-resolved");
        }
        self.forward_game_events();
        self.admin_action(AdminOp::ForceResolveChallenge);
        Ok(())
    }

    /// Return each staker's whole deposit and turn it into a zombie.
    pub fn force_refund_staker(
        &mut self,
        sender: &Address,
        stakers: &[Address],
    ) -> Result<(), RollupError> {
        self.require_admin(sender)?;
        self.require_paused()?;
        if stakers.is_empty() {
            return Err(RollupError::EmptyList);
        }
        for staker in stakers {
            self.require_unchallenged_staker(staker)?;
        }
        for staker in stakers {
            let Some(record) = self.stakers.get_mut(staker) else {
                continue;
            };
            let amount = std::mem::replace(&mut record.amount_staked, Amount::ZERO);
            self.credit_withdrawable(staker, amount);
            self.turn_into_zombie(staker);
            tracing::warn!(%staker, %amount, "stake force-refunded");
        }
        self.admin_action(AdminOp::ForceRefundStaker);
        Ok(())
    }

    /// Create a child of the latest confirmed assertion with content checks
    /// only and no staker.
    pub fn force_create_assertion(
        &mut self,
        sender: &Address,
        input: NewAssertion,
        inbox: &dyn Inbox,
        now: BlockNumber,
    ) -> Result<AssertionId, RollupError> {
        self.require_admin(sender)?;
        self.require_paused()?;
        if input.parent != self.latest_confirmed() {
            return Err(RollupError::NotLatestConfirmed(input.parent));
        }
        let id = match self.prepare_assertion(&input, inbox, now, Checks::Admin)? {
            Prepared::Existing(id) => id,
            Prepared::New(node) => self.insert_assertion(*node, now),
        };
        tracing::warn!(assertion = %id, "assertion force-created");
        self.admin_action(AdminOp::ForceCreateAssertion);
        Ok(id)
    }

    /// Confirm a pending child of the latest confirmed assertion, rejecting
    /// every older unresolved assertion it skips over.
    pub fn force_confirm_assertion(
        &mut self,
        sender: &Address,
        id: &AssertionId,
        block_hash: Bytes32,
        send_root: Bytes32,
    ) -> Result<(), RollupError> {
        self.require_admin(sender)?;
        self.require_paused()?;
        let node = self.node_or_err(id)?;
        if !node.is_pending() {
            return Err(RollupError::AlreadyResolved(*id));
        }
        if node.assertion.parent_id != self.latest_confirmed() {
            return Err(RollupError::ParentNotConfirmed(*id));
        }
        if vigil_crypto::confirm_data(&block_hash, &send_root) != node.confirm_data {
            return Err(RollupError::ConfirmDataMismatch(*id));
        }
        let seq = node.seq();

        let skipped: Vec<AssertionId> = (self.first_unresolved..seq)
            .map(|s| self.id_at(s))
            .filter(|s| self.assertions.get(s).is_some_and(|n| n.is_pending()))
            .collect();
        for skipped_id in &skipped {
            self.mark_rejected(skipped_id);
        }
        self.mark_confirmed(id, block_hash, send_root);
        tracing::warn!(assertion = %id, skipped = skipped.len(), "assertion force-confirmed");
        self.admin_action(AdminOp::ForceConfirmAssertion);
        Ok(())
    }

    fn admin_action(&mut self, op: AdminOp) {
        self.emit(RollupEvent::AdminAction { op });
    }
}
