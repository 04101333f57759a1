//! Opening challenges between sibling stakers and applying their verdicts.

use serde::{Deserialize, Serialize};

use vigil_challenge::{Bisection, ChallengeOutcome, OneStepVerifier, Participant};
use vigil_types::{Address, Amount, AssertionId, BlockNumber, Bytes32, ChallengeId, Crank, EdgeId};

use crate::chain::AssertionChain;
use crate::error::RollupError;
use crate::event::RollupEvent;

/// Result of [`AssertionChain::create_challenge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeStart {
    Started(ChallengeId),
    /// The younger assertion arrived after the older one's challenge window;
    /// its staker lost without a game.
    LateSibling,
}

impl AssertionChain {
    /// Open a challenge between `stakers[0]` on `assertions[0]` and
    /// `stakers[1]` on `assertions[1]`. The first assertion must be the older
    /// sibling; its staker moves first.
    pub fn create_challenge(
        &mut self,
        sender: &Address,
        stakers: [Address; 2],
        assertions: [AssertionId; 2],
        now: BlockNumber,
    ) -> Result<ChallengeStart, RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        let [staker_a, staker_b] = stakers;
        let [id_a, id_b] = assertions;
        let a = self.node_or_err(&id_a)?;
        let b = self.node_or_err(&id_b)?;
        if a.seq() >= b.seq() {
            return Err(RollupError::WrongOrder);
        }
        for node in [a, b] {
            if !node.is_pending() {
                return Err(RollupError::AlreadyResolved(node.id()));
            }
        }
        let parent_id = a.assertion.parent_id;
        if parent_id != b.assertion.parent_id {
            return Err(RollupError::NotSiblings);
        }
        self.require_unchallenged_staker(&staker_a)?;
        self.require_unchallenged_staker(&staker_b)?;
        for (staker, node) in [(staker_a, a), (staker_b, b)] {
            if !node.has_staker(&staker) {
                return Err(RollupError::NotStakedOn {
                    staker,
                    assertion: node.id(),
                });
            }
        }

        let parent = self.node_or_err(&parent_id)?;
        let window = a.assertion.deadline.elapsed_since(a.assertion.proposed_at);
        let cutoff = parent
            .first_child_at
            .unwrap_or(a.assertion.proposed_at)
            .saturating_add(window)
            .saturating_add(self.params.extra_challenge_time_blocks);
        if cutoff < b.assertion.proposed_at {
            tracing::info!(older = %id_a, younger = %id_b, "late sibling loses without a game");
            self.complete_challenge(&staker_a, &staker_b, None);
            return Ok(ChallengeStart::LateSibling);
        }

        let start_commit = vigil_crypto::execution_state_hash(&a.assertion.before_state);
        let (end_a, end_b) = (a.execution_hash, b.execution_hash);
        let num_steps = a.assertion.num_steps.max(b.assertion.num_steps);
        let challenge_id = self.game.create(
            Participant {
                staker: staker_a,
                assertion: id_a,
            },
            Participant {
                staker: staker_b,
                assertion: id_b,
            },
            start_commit,
            end_a,
            end_b,
            num_steps,
            now,
        )?;
        for staker in [staker_a, staker_b] {
            if let Some(record) = self.stakers.get_mut(&staker) {
                record.current_challenge = Some(challenge_id);
            }
        }
        self.forward_game_events();
        self.emit(RollupEvent::ChallengeStarted {
            challenge_id,
            challenger: staker_a,
            asserter: staker_b,
            challenged: id_b,
        });
        tracing::info!(challenge = %challenge_id, challenger = %staker_a, asserter = %staker_b, "challenge started");
        Ok(ChallengeStart::Started(challenge_id))
    }

    /// Bisect the sender's frontier edge.
    pub fn bisect(
        &mut self,
        sender: &Address,
        edge_id: &EdgeId,
        commits: &[Bytes32],
        now: BlockNumber,
    ) -> Result<Bisection, RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        let bisection = self.game.bisect(sender, edge_id, commits, now)?;
        self.forward_game_events();
        Ok(bisection)
    }

    /// Settle a one-step edge and apply the verdict.
    pub fn prove_one_step(
        &mut self,
        sender: &Address,
        edge_id: &EdgeId,
        proof: &[u8],
        verifier: &dyn OneStepVerifier,
        now: BlockNumber,
    ) -> Result<ChallengeOutcome, RollupError> {
        self.require_not_paused()?;
        self.require_validator(sender)?;
        self.require_participants_of_edge(edge_id)?;
        let outcome = self.game.prove_one_step(sender, edge_id, proof, verifier, now)?;
        self.apply_outcome(&outcome);
        Ok(outcome)
    }

    /// Permissionless: time out the side that let `edge_id` expire.
    pub fn timeout(
        &mut self,
        edge_id: &EdgeId,
        now: BlockNumber,
    ) -> Result<Crank<ChallengeOutcome>, RollupError> {
        self.require_not_paused()?;
        self.require_participants_of_edge(edge_id)?;
        let crank = self.game.timeout(edge_id, now)?;
        if let Crank::Done(outcome) = &crank {
            self.apply_outcome(outcome);
        }
        Ok(crank)
    }

    /// [`Self::timeout`] against whichever edge `challenge_id` is waiting on.
    pub fn timeout_challenge(
        &mut self,
        challenge_id: &ChallengeId,
        now: BlockNumber,
    ) -> Result<Crank<ChallengeOutcome>, RollupError> {
        self.require_not_paused()?;
        self.require_participants(challenge_id)?;
        let crank = self.game.timeout_challenge(challenge_id, now)?;
        if let Crank::Done(outcome) = &crank {
            self.apply_outcome(outcome);
        }
        Ok(crank)
    }

    fn apply_outcome(&mut self, outcome: &ChallengeOutcome) {
        self.forward_game_events();
        self.complete_challenge(
            &outcome.winner.staker,
            &outcome.loser.staker,
            Some(outcome.challenge_id),
        );
    }

    /// Both stakers of the challenge owning `edge_id` are still engaged in it.
    fn require_participants_of_edge(&self, edge_id: &EdgeId) -> Result<(), RollupError> {
        let challenge_id = self
            .game
            .edge(edge_id)
            .map(|e| e.challenge_id)
            .ok_or(vigil_challenge::ChallengeError::UnknownEdge(*edge_id))?;
        self.require_participants(&challenge_id)
    }

    fn require_participants(&self, challenge_id: &ChallengeId) -> Result<(), RollupError> {
        let challenge = self
            .game
            .challenge(challenge_id)
            .ok_or(vigil_challenge::ChallengeError::UnknownChallenge(*challenge_id))?;
        let (a, b) = (challenge.challenger.staker, challenge.asserter.staker);
        let engaged =
            |s: &Address| self.stakers.get(s).and_then(|r| r.current_challenge) == Some(*challenge_id);
        if !engaged(&a) || !engaged(&b) {
            return Err(RollupError::NotInChallenge(a, b));
        }
        Ok(())
    }

    /// Pay out a verdict: the loser's stake, capped at the winner's, is split
    /// between the winner and the escrow; any excess goes back to the loser,
    /// who becomes a zombie.
    pub(crate) fn complete_challenge(
        &mut self,
        winner: &Address,
        loser: &Address,
        challenge_id: Option<ChallengeId>,
    ) {
        let winner_stake = self.amount_staked(winner);
        let loser_stake = self.amount_staked(loser);
        let at_risk = loser_stake.min(winner_stake);
        self.credit_withdrawable(loser, loser_stake.saturating_sub(at_risk));

        let won = at_risk.half();
        if let Some(record) = self.stakers.get_mut(winner) {
            record.amount_staked = record.amount_staked.saturating_add(won);
            record.current_challenge = None;
        }
        let escrow = self.params.loser_stake_escrow;
        self.credit_withdrawable(&escrow, at_risk.saturating_sub(won));

        if let Some(record) = self.stakers.get_mut(loser) {
            record.amount_staked = Amount::ZERO;
            record.current_challenge = None;
        }
        self.turn_into_zombie(loser);
        self.emit(RollupEvent::ChallengeResolved {
            challenge_id,
            winner: *winner,
            loser: *loser,
        });
        tracing::info!(?challenge_id, %winner, %loser, %won, "challenge resolved");
    }
}
