//! The challenge manager: every bisection game and every edge.
//!
//! Each challenge is a two-player game between the staker of an older
//! assertion (the challenger, who always moves first) and the staker of a
//! younger sibling (the asserter). Both start with a rival edge over the same
//! block range. In each round the challenger bisects its frontier edge, then
//! the asserter bisects its own at the same midpoint; of the four children,
//! exactly one pair is rivaled and becomes the new frontier. A single step at
//! a coarse level opens a full range at the next finer level, and a single
//! small step is settled by the one-step verifier. A player who lets its
//! deadline pass loses by timeout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use vigil_types::{
    Address, AssertionId, BlockNumber, Bytes32, ChallengeId, Crank, EdgeId, GameParams, NotYet,
};

use crate::edge::{Edge, EdgeSpec, EdgeStatus};
use crate::error::ChallengeError;
use crate::event::GameEvent;
use crate::level::EdgeLevel;
use crate::verifier::OneStepVerifier;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Backs the older assertion and moves first in every round.
    Challenger,
    /// Backs the younger sibling.
    Asserter,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Self::Challenger => Self::Asserter,
            Self::Asserter => Self::Challenger,
        }
    }
}

/// A staker and the assertion it defends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub staker: Address,
    pub assertion: AssertionId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Timeout,
    OneStepProof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeStatus {
    Active {
        level: EdgeLevel,
        turn: Side,
        challenger_edge: EdgeId,
        asserter_edge: EdgeId,
    },
    Resolved {
        winner: Side,
        reason: Resolution,
    },
    /// Ended by an admin without a winner.
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub challenger: Participant,
    pub asserter: Participant,
    pub created_at: BlockNumber,
    /// Bisections and proofs made so far.
    pub moves: u64,
    /// Every edge of this challenge in creation order.
    pub edges: Vec<EdgeId>,
    pub status: ChallengeStatus,
}

impl Challenge {
    pub fn participant(&self, side: Side) -> &Participant {
        match side {
            Side::Challenger => &self.challenger,
            Side::Asserter => &self.asserter,
        }
    }

    pub fn side_of(&self, staker: &Address) -> Option<Side> {
        if self.challenger.staker == *staker {
            Some(Side::Challenger)
        } else if self.asserter.staker == *staker {
            Some(Side::Asserter)
        } else {
            None
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ChallengeStatus::Active { .. })
    }

    /// The side's current frontier edge while the game is running.
    pub fn frontier_edge(&self, side: Side) -> Option<EdgeId> {
        match self.status {
            ChallengeStatus::Active {
                challenger_edge,
                asserter_edge,
                ..
            } => Some(match side {
                Side::Challenger => challenger_edge,
                Side::Asserter => asserter_edge,
            }),
            _ => None,
        }
    }
}

/// Verdict handed back to the assertion chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeOutcome {
    pub challenge_id: ChallengeId,
    pub winner: Participant,
    pub loser: Participant,
    pub reason: Resolution,
}

/// Result of a successful bisection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bisection {
    pub lower: EdgeId,
    pub upper: EdgeId,
    pub next_responder: Address,
}

struct Frontier {
    level: EdgeLevel,
    challenger: EdgeId,
    asserter: EdgeId,
}

/// Edges and events produced by one operation, applied only once it can no
/// longer fail.
#[derive(Default)]
struct Staged {
    edges: Vec<Edge>,
    events: Vec<GameEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChallengeManager {
    game: GameParams,
    challenges: BTreeMap<ChallengeId, Challenge>,
    edges: BTreeMap<EdgeId, Edge>,
    last_id: ChallengeId,
    #[serde(skip)]
    pending_events: Vec<GameEvent>,
}

impl ChallengeManager {
    pub fn new(game: GameParams) -> Self {
        Self {
            game,
            challenges: BTreeMap::new(),
            edges: BTreeMap::new(),
            last_id: ChallengeId::new(0),
            pending_events: Vec::new(),
        }
    }

    pub fn params(&self) -> &GameParams {
        &self.game
    }

    /// Open a challenge over `[0, max(num_steps, 1)]` at the block level.
    ///
    /// `start_commit` is the shared before-state; the end commitments are each
    /// side's claimed outcome.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        challenger: Participant,
        asserter: Participant,
        start_commit: Bytes32,
        challenger_end: Bytes32,
        asserter_end: Bytes32,
        num_steps: u64,
        now: BlockNumber,
    ) -> Result<ChallengeId, ChallengeError> {
        if challenger.staker == asserter.staker {
            return Err(ChallengeError::SelfChallenge);
        }
        if challenger_end == asserter_end {
            return Err(ChallengeError::NoDisagreement);
        }
        let length = num_steps.max(1);
        let max = EdgeLevel::Block.leaf_size(&self.game);
        if length > max {
            return Err(ChallengeError::RangeTooLarge {
                level: EdgeLevel::Block,
                length,
                max,
            });
        }

        let id = self.last_id.next();
        let deadline = self.deadline_from(now);
        let root = |end_commit: Bytes32, claimant: Address| EdgeSpec {
            level: EdgeLevel::Block,
            start_height: 0,
            end_height: length,
            start_commit,
            end_commit,
            claimant,
            parent: None,
            origin: None,
        };
        let c = Edge::new(id, root(challenger_end, challenger.staker), now, deadline);
        let a = Edge::new(id, root(asserter_end, asserter.staker), now, deadline);

        let mut staged = Staged::default();
        staged.events.push(GameEvent::ChallengeCreated {
            challenge_id: id,
            challenger,
            asserter,
            start_commit,
            num_steps,
        });
        let frontier = self.descend(c, a, now, &mut staged);

        self.last_id = id;
        self.challenges.insert(
            id,
            Challenge {
                id,
                challenger,
                asserter,
                created_at: now,
                moves: 0,
                edges: Vec::new(),
                status: ChallengeStatus::Active {
                    level: frontier.level,
                    turn: Side::Challenger,
                    challenger_edge: frontier.challenger,
                    asserter_edge: frontier.asserter,
                },
            },
        );
        self.apply(id, staged);

        tracing::info!(
            challenge = %id,
            challenger = %challenger.staker,
            asserter = %asserter.staker,
            length,
            "challenge created"
        );
        Ok(id)
    }

    /// Split the sender's frontier edge at its midpoint.
    ///
    /// `commits` must be `[start, mid, end]` where `start` and `end` reproduce
    /// the edge's own commitments.
    pub fn bisect(
        &mut self,
        sender: &Address,
        edge_id: &EdgeId,
        commits: &[Bytes32],
        now: BlockNumber,
    ) -> Result<Bisection, ChallengeError> {
        let edge = self.edge_or_err(edge_id)?.clone();
        let challenge = self.challenge_or_err(&edge.challenge_id)?;
        let ChallengeStatus::Active {
            turn,
            challenger_edge,
            asserter_edge,
            ..
        } = challenge.status
        else {
            return Err(ChallengeError::ChallengeNotActive(challenge.id));
        };
        if edge.claimant != *sender {
            return Err(ChallengeError::NotClaimant {
                edge: *edge_id,
                sender: *sender,
            });
        }
        let side = challenge
            .side_of(sender)
            .ok_or(ChallengeError::NotClaimant {
                edge: *edge_id,
                sender: *sender,
            })?;
        let own_frontier = match side {
            Side::Challenger => challenger_edge,
            Side::Asserter => asserter_edge,
        };
        if own_frontier != *edge_id {
            return Err(ChallengeError::EdgeNotOnFrontier(*edge_id));
        }
        if side != turn {
            return Err(ChallengeError::NotYourTurn {
                expected: challenge.participant(turn).staker,
            });
        }
        if edge.deadline.is_passed_at(now) {
            return Err(ChallengeError::DeadlineExpired {
                deadline: edge.deadline,
            });
        }
        if edge.length() < 2 {
            return Err(ChallengeError::CannotBisect {
                length: edge.length(),
            });
        }
        let [start, mid_commit, end] = commits else {
            return Err(ChallengeError::BadBisection(format!(
                "expected 3 commitments, got {}",
                commits.len()
            )));
        };
        if *start != edge.start_commit {
            return Err(ChallengeError::BadBisection(
                "first commitment does not match the edge start".into(),
            ));
        }
        if *end != edge.end_commit {
            return Err(ChallengeError::BadBisection(
                "last commitment does not match the edge end".into(),
            ));
        }

        let challenge_id = challenge.id;
        let participants = (challenge.challenger, challenge.asserter);
        let mid = edge.start_height + edge.length() / 2;
        let deadline = self.deadline_from(now);
        let half = |start_height, end_height, start_commit, end_commit| EdgeSpec {
            level: edge.level,
            start_height,
            end_height,
            start_commit,
            end_commit,
            claimant: edge.claimant,
            parent: Some(edge.id),
            origin: None,
        };
        let lower = Edge::new(
            challenge_id,
            half(edge.start_height, mid, edge.start_commit, *mid_commit),
            now,
            deadline,
        );
        let upper = Edge::new(
            challenge_id,
            half(mid, edge.end_height, *mid_commit, edge.end_commit),
            now,
            deadline,
        );
        for child in [&lower, &upper] {
            if self.edges.contains_key(&child.id) {
                return Err(ChallengeError::DuplicateEdge(child.id));
            }
        }

        let mut staged = Staged::default();
        staged.events.push(GameEvent::EdgeBisected {
            edge_id: edge.id,
            lower: lower.id,
            upper: upper.id,
            mid_commit: *mid_commit,
        });
        let bisection_ids = (lower.id, upper.id);
        let mut parent = edge;
        parent.status = EdgeStatus::Bisected;
        parent.lower_child = Some(lower.id);
        parent.upper_child = Some(upper.id);
        let level = parent.level;
        staged.edges.push(parent);

        let status = match side {
            Side::Challenger => {
                let mut rival = self.edge_or_err(&asserter_edge)?.clone();
                rival.deadline = deadline;
                staged.edges.extend([lower, upper, rival]);
                ChallengeStatus::Active {
                    level,
                    turn: Side::Asserter,
                    challenger_edge,
                    asserter_edge,
                }
            }
            Side::Asserter => {
                let opponent = self.edge_or_err(&challenger_edge)?;
                let (Some(c_lower), Some(c_upper)) = (opponent.lower_child, opponent.upper_child)
                else {
                    return Err(ChallengeError::EdgeNotOnFrontier(challenger_edge));
                };
                let c_lower = self.edge_or_err(&c_lower)?.clone();
                let c_upper = self.edge_or_err(&c_upper)?.clone();
                staged.edges.push(lower.clone());
                staged.edges.push(upper.clone());
                // Agreement on the midpoint moves the dispute to the upper half.
                let (mut c, a) = if c_lower.end_commit != lower.end_commit {
                    (c_lower, lower)
                } else {
                    (c_upper, upper)
                };
                c.deadline = deadline;
                let frontier = self.descend(c, a, now, &mut staged);
                ChallengeStatus::Active {
                    level: frontier.level,
                    turn: Side::Challenger,
                    challenger_edge: frontier.challenger,
                    asserter_edge: frontier.asserter,
                }
            }
        };

        let next_responder = match status {
            ChallengeStatus::Active {
                turn: Side::Challenger,
                ..
            } => participants.0.staker,
            _ => participants.1.staker,
        };
        if let Some(challenge) = self.challenges.get_mut(&challenge_id) {
            challenge.status = status;
            challenge.moves += 1;
        }
        self.apply(challenge_id, staged);

        tracing::debug!(
            challenge = %challenge_id,
            edge = %edge_id,
            mid,
            next = %next_responder,
            "edge bisected"
        );
        Ok(Bisection {
            lower: bisection_ids.0,
            upper: bisection_ids.1,
            next_responder,
        })
    }

    /// Settle a one-step frontier edge with the verifier.
    ///
    /// The side whose end commitment equals the verifier's output wins at
    /// once. An output matching neither side is a fault: nothing changes.
    pub fn prove_one_step(
        &mut self,
        sender: &Address,
        edge_id: &EdgeId,
        proof: &[u8],
        verifier: &dyn OneStepVerifier,
        now: BlockNumber,
    ) -> Result<ChallengeOutcome, ChallengeError> {
        let edge = self.edge_or_err(edge_id)?;
        let challenge = self.challenge_or_err(&edge.challenge_id)?;
        let ChallengeStatus::Active {
            turn,
            challenger_edge,
            asserter_edge,
            ..
        } = challenge.status
        else {
            return Err(ChallengeError::ChallengeNotActive(challenge.id));
        };
        if edge.claimant != *sender {
            return Err(ChallengeError::NotClaimant {
                edge: *edge_id,
                sender: *sender,
            });
        }
        if *edge_id != challenger_edge && *edge_id != asserter_edge {
            return Err(ChallengeError::EdgeNotOnFrontier(*edge_id));
        }
        if !edge.is_one_step() {
            return Err(ChallengeError::NotOneStep(*edge_id));
        }
        let awaited = match turn {
            Side::Challenger => challenger_edge,
            Side::Asserter => asserter_edge,
        };
        let awaited_deadline = self.edge_or_err(&awaited)?.deadline;
        if awaited_deadline.is_passed_at(now) {
            return Err(ChallengeError::DeadlineExpired {
                deadline: awaited_deadline,
            });
        }

        let challenge_id = challenge.id;
        let computed = verifier.prove_one_step(&edge.start_commit, proof)?;
        let challenger_end = self.edge_or_err(&challenger_edge)?.end_commit;
        let asserter_end = self.edge_or_err(&asserter_edge)?.end_commit;
        let winner = if computed == challenger_end {
            Side::Challenger
        } else if computed == asserter_end {
            Side::Asserter
        } else {
            tracing::error!(
                challenge = %challenge_id,
                %computed,
                "one-step result matches neither claim"
            );
            return Err(ChallengeError::AdjudicationFault {
                challenge: challenge_id,
                computed,
            });
        };

        if let Some(challenge) = self.challenges.get_mut(&challenge_id) {
            challenge.moves += 1;
        }
        self.resolve(
            challenge_id,
            winner,
            Resolution::OneStepProof,
            EdgeStatus::Refuted,
        )
    }

    /// Permissionless: end the game against the side that let `edge_id` expire.
    pub fn timeout(
        &mut self,
        edge_id: &EdgeId,
        now: BlockNumber,
    ) -> Result<Crank<ChallengeOutcome>, ChallengeError> {
        let edge = self.edge_or_err(edge_id)?;
        let challenge = self.challenge_or_err(&edge.challenge_id)?;
        let ChallengeStatus::Active { turn, .. } = challenge.status else {
            return Err(ChallengeError::ChallengeNotActive(challenge.id));
        };
        if challenge.frontier_edge(turn) != Some(*edge_id) {
            return Err(ChallengeError::EdgeNotAwaited(*edge_id));
        }
        if !edge.deadline.is_passed_at(now) {
            tracing::debug!(edge = %edge_id, deadline = %edge.deadline, "timeout not yet due");
            return Ok(Crank::NotYet(NotYet::BeforeDeadline {
                deadline: edge.deadline,
            }));
        }
        let challenge_id = challenge.id;
        let outcome = self.resolve(
            challenge_id,
            turn.opponent(),
            Resolution::Timeout,
            EdgeStatus::TimedOut,
        )?;
        Ok(Crank::Done(outcome))
    }

    /// [`Self::timeout`] against whichever edge the challenge is waiting on.
    pub fn timeout_challenge(
        &mut self,
        challenge_id: &ChallengeId,
        now: BlockNumber,
    ) -> Result<Crank<ChallengeOutcome>, ChallengeError> {
        let edge_id = self
            .awaited_edge(challenge_id)?
            .ok_or(ChallengeError::ChallengeNotActive(*challenge_id))?
            .id;
        self.timeout(&edge_id, now)
    }

    /// End a running challenge without a winner.
    pub fn cancel(&mut self, challenge_id: &ChallengeId) -> Result<(), ChallengeError> {
        let challenge = self
            .challenges
            .get_mut(challenge_id)
            .ok_or(ChallengeError::UnknownChallenge(*challenge_id))?;
        if !challenge.is_active() {
            return Err(ChallengeError::ChallengeNotActive(*challenge_id));
        }
        challenge.status = ChallengeStatus::Cancelled;
        self.pending_events.push(GameEvent::ChallengeCancelled {
            challenge_id: *challenge_id,
        });
        tracing::warn!(challenge = %challenge_id, "challenge cancelled");
        Ok(())
    }

    // --- queries ---

    pub fn challenge(&self, id: &ChallengeId) -> Option<&Challenge> {
        self.challenges.get(id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// All edges of a challenge in creation order.
    pub fn edges_of(&self, id: &ChallengeId) -> Vec<&Edge> {
        self.challenges
            .get(id)
            .map(|c| c.edges.iter().filter_map(|e| self.edges.get(e)).collect())
            .unwrap_or_default()
    }

    /// The edge whose claimant must move next, if the challenge is running.
    pub fn awaited_edge(&self, id: &ChallengeId) -> Result<Option<&Edge>, ChallengeError> {
        let challenge = self.challenge_or_err(id)?;
        Ok(match challenge.status {
            ChallengeStatus::Active { turn, .. } => challenge
                .frontier_edge(turn)
                .and_then(|e| self.edges.get(&e)),
            _ => None,
        })
    }

    /// The staker who must move next, or `None` once the challenge has ended.
    pub fn current_responder(&self, id: &ChallengeId) -> Option<Address> {
        let challenge = self.challenges.get(id)?;
        match challenge.status {
            ChallengeStatus::Active { turn, .. } => Some(challenge.participant(turn).staker),
            _ => None,
        }
    }

    /// Whether the responder has let its deadline pass.
    pub fn is_timed_out(&self, id: &ChallengeId, now: BlockNumber) -> bool {
        matches!(self.awaited_edge(id), Ok(Some(edge)) if edge.deadline.is_passed_at(now))
    }

    /// The edge rivaling `edge_id`, if one exists.
    pub fn rival_of(&self, edge_id: &EdgeId) -> Option<EdgeId> {
        let edge = self.edges.get(edge_id)?;
        self.edges_of(&edge.challenge_id)
            .into_iter()
            .find(|other| other.is_rival_of(edge))
            .map(|other| other.id)
    }

    pub fn active_challenges(&self) -> impl Iterator<Item = &Challenge> {
        self.challenges.values().filter(|c| c.is_active())
    }

    pub fn challenge_count(&self) -> usize {
        self.challenges.len()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // --- internals ---

    fn deadline_from(&self, now: BlockNumber) -> BlockNumber {
        now.saturating_add(self.game.round_timeout_blocks)
    }

    fn edge_or_err(&self, id: &EdgeId) -> Result<&Edge, ChallengeError> {
        self.edges.get(id).ok_or(ChallengeError::UnknownEdge(*id))
    }

    fn challenge_or_err(&self, id: &ChallengeId) -> Result<&Challenge, ChallengeError> {
        self.challenges
            .get(id)
            .ok_or(ChallengeError::UnknownChallenge(*id))
    }

    /// Escalate a rival pair while it is a single step at a non-final level.
    fn descend(&self, mut c: Edge, mut a: Edge, now: BlockNumber, staged: &mut Staged) -> Frontier {
        while c.length() == 1 {
            let Some(next) = c.level.next(&self.game) else {
                break;
            };
            let deadline = self.deadline_from(now);
            let length = next.leaf_size(&self.game);
            let refine = |coarse: &Edge| EdgeSpec {
                level: next,
                start_height: 0,
                end_height: length,
                start_commit: coarse.start_commit,
                end_commit: coarse.end_commit,
                claimant: coarse.claimant,
                parent: None,
                origin: Some(coarse.id),
            };
            let fine_c = Edge::new(c.challenge_id, refine(&c), now, deadline);
            let fine_a = Edge::new(a.challenge_id, refine(&a), now, deadline);
            staged.events.push(GameEvent::LevelEscalated {
                challenge_id: c.challenge_id,
                from: c.level,
                to: next,
            });
            c.status = EdgeStatus::Escalated;
            a.status = EdgeStatus::Escalated;
            staged.edges.push(c);
            staged.edges.push(a);
            c = fine_c;
            a = fine_a;
        }
        let frontier = Frontier {
            level: c.level,
            challenger: c.id,
            asserter: a.id,
        };
        staged.edges.push(c);
        staged.edges.push(a);
        frontier
    }

    fn apply(&mut self, challenge_id: ChallengeId, staged: Staged) {
        self.pending_events.extend(staged.events);
        for edge in staged.edges {
            if !self.edges.contains_key(&edge.id) {
                if let Some(challenge) = self.challenges.get_mut(&challenge_id) {
                    challenge.edges.push(edge.id);
                }
                self.pending_events
                    .push(GameEvent::EdgeAdded { edge: edge.clone() });
            }
            self.edges.insert(edge.id, edge);
        }
    }

    /// Close an active challenge and settle the status of its edges.
    fn resolve(
        &mut self,
        challenge_id: ChallengeId,
        winner: Side,
        reason: Resolution,
        loser_status: EdgeStatus,
    ) -> Result<ChallengeOutcome, ChallengeError> {
        let challenge = self
            .challenges
            .get_mut(&challenge_id)
            .ok_or(ChallengeError::UnknownChallenge(challenge_id))?;
        let loser_edge = challenge.frontier_edge(winner.opponent());
        let winner_staker = challenge.participant(winner).staker;
        let edge_ids = challenge.edges.clone();
        challenge.status = ChallengeStatus::Resolved { winner, reason };
        let outcome = ChallengeOutcome {
            challenge_id,
            winner: *challenge.participant(winner),
            loser: *challenge.participant(winner.opponent()),
            reason,
        };

        for id in &edge_ids {
            let Some(edge) = self.edges.get_mut(id) else {
                continue;
            };
            if Some(*id) == loser_edge {
                edge.status = loser_status;
            } else if edge.claimant == winner_staker && !edge.status.is_resolved() {
                edge.status = EdgeStatus::Confirmed;
            } else if edge.status == EdgeStatus::Pending {
                // Unrivaled: nobody disputed it.
                edge.status = EdgeStatus::Confirmed;
            }
        }
        self.pending_events
            .push(GameEvent::ChallengeResolved { outcome });
        tracing::info!(
            challenge = %challenge_id,
            winner = %outcome.winner.staker,
            loser = %outcome.loser.staker,
            ?reason,
            "challenge resolved"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::max_moves;

    fn bn(n: u64) -> BlockNumber {
        BlockNumber::new(n)
    }

    fn hash(byte: u8) -> Bytes32 {
        Bytes32::new([byte; 32])
    }

    fn alice() -> Participant {
        Participant {
            staker: Address::new([0xa1; 20]),
            assertion: AssertionId::new(hash(0x0a)),
        }
    }

    fn bob() -> Participant {
        Participant {
            staker: Address::new([0xb0; 20]),
            assertion: AssertionId::new(hash(0x0b)),
        }
    }

    fn game() -> GameParams {
        GameParams {
            block_leaf_size: 16,
            big_step_leaf_size: 4,
            small_step_leaf_size: 2,
            num_big_step_levels: 1,
            round_timeout_blocks: 10,
        }
    }

    /// Alice and Bob dispute ten blocks starting at block 100.
    fn setup() -> (ChallengeManager, ChallengeId) {
        let mut mgr = ChallengeManager::new(game());
        let id = mgr
            .create(alice(), bob(), hash(1), hash(0xaa), hash(0xbb), 10, bn(100))
            .expect("should create challenge");
        (mgr, id)
    }

    /// Each side's intermediate commitment: shared below `disagree_from`,
    /// claimant-specific from there on.
    fn mid_commit(edge: &Edge, disagree_from: u64) -> Bytes32 {
        let mid = edge.start_height + edge.length() / 2;
        let tag = edge.level.tag();
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&mid.to_be_bytes());
        bytes[8..10].copy_from_slice(&tag);
        if mid >= disagree_from {
            bytes[10..30].copy_from_slice(edge.claimant.as_bytes());
        }
        Bytes32::new(bytes)
    }

    fn bisect_awaited(
        mgr: &mut ChallengeManager,
        id: &ChallengeId,
        disagree_from: u64,
        now: BlockNumber,
    ) -> Result<Bisection, ChallengeError> {
        let edge = mgr
            .awaited_edge(id)
            .expect("challenge exists")
            .expect("challenge is active")
            .clone();
        let commits = [edge.start_commit, mid_commit(&edge, disagree_from), edge.end_commit];
        mgr.bisect(&edge.claimant, &edge.id, &commits, now)
    }

    /// Play until the frontier is a single small step. Block-level histories
    /// diverge at height 3, finer levels right after the start.
    fn play_to_one_step(mgr: &mut ChallengeManager, id: &ChallengeId, mut now: u64) -> u64 {
        loop {
            let edge = mgr.awaited_edge(id).unwrap().unwrap().clone();
            if edge.is_one_step() {
                return now;
            }
            let disagree_from = if edge.level == EdgeLevel::Block { 3 } else { 1 };
            now += 1;
            bisect_awaited(mgr, id, disagree_from, bn(now)).expect("bisection should succeed");
        }
    }

    fn echo_verifier(_before: &Bytes32, proof: &[u8]) -> Result<Bytes32, ChallengeError> {
        let bytes: [u8; 32] = proof
            .try_into()
            .map_err(|_| ChallengeError::InvalidProof("proof must be 32 bytes".into()))?;
        Ok(Bytes32::new(bytes))
    }

    fn frontier(mgr: &ChallengeManager, id: &ChallengeId) -> (Edge, Edge) {
        let c = mgr.challenge(id).unwrap();
        let ce = mgr.edge(&c.frontier_edge(Side::Challenger).unwrap()).unwrap().clone();
        let ae = mgr.edge(&c.frontier_edge(Side::Asserter).unwrap()).unwrap().clone();
        (ce, ae)
    }

    // --- creation ---

    #[test]
    fn create_opens_rival_block_edges() {
        let (mgr, id) = setup();
        let (c, a) = frontier(&mgr, &id);
        assert!(c.is_rival_of(&a));
        assert_eq!((c.start_height, c.end_height), (0, 10));
        assert_eq!(c.level, EdgeLevel::Block);
        assert_eq!(c.deadline, bn(110));
        assert_eq!(mgr.current_responder(&id), Some(alice().staker));
        assert_eq!(mgr.rival_of(&c.id), Some(a.id));
    }

    #[test]
    fn create_rejects_agreement_and_self_challenge() {
        let mut mgr = ChallengeManager::new(game());
        let err = mgr
            .create(alice(), bob(), hash(1), hash(2), hash(2), 4, bn(0))
            .unwrap_err();
        assert!(matches!(err, ChallengeError::NoDisagreement));

        let err = mgr
            .create(alice(), alice(), hash(1), hash(2), hash(3), 4, bn(0))
            .unwrap_err();
        assert!(matches!(err, ChallengeError::SelfChallenge));
        assert_eq!(mgr.challenge_count(), 0);
    }

    #[test]
    fn create_rejects_range_above_block_leaf() {
        let mut mgr = ChallengeManager::new(game());
        let err = mgr
            .create(alice(), bob(), hash(1), hash(2), hash(3), 17, bn(0))
            .unwrap_err();
        assert!(matches!(err, ChallengeError::RangeTooLarge { length: 17, .. }));
    }

    #[test]
    fn single_block_dispute_escalates_immediately() {
        let mut mgr = ChallengeManager::new(game());
        let id = mgr
            .create(alice(), bob(), hash(1), hash(2), hash(3), 1, bn(0))
            .unwrap();
        let (c, a) = frontier(&mgr, &id);
        assert_eq!(c.level, EdgeLevel::BigStep(0));
        assert_eq!((c.start_height, c.end_height), (0, 4));
        assert!(c.is_rival_of(&a));
        let origin = mgr.edge(&c.origin.unwrap()).unwrap();
        assert_eq!(origin.level, EdgeLevel::Block);
        assert_eq!(origin.status, EdgeStatus::Escalated);
    }

    // --- bisection ---

    #[test]
    fn bisecting_ten_blocks_splits_at_five() {
        let (mut mgr, id) = setup();
        let b = bisect_awaited(&mut mgr, &id, 3, bn(101)).unwrap();
        let lower = mgr.edge(&b.lower).unwrap();
        let upper = mgr.edge(&b.upper).unwrap();
        assert_eq!((lower.start_height, lower.end_height), (0, 5));
        assert_eq!((upper.start_height, upper.end_height), (5, 10));
        assert_eq!(lower.end_commit, upper.start_commit);
        assert_eq!(b.next_responder, bob().staker);
        assert_eq!(mgr.current_responder(&id), Some(bob().staker));
    }

    #[test]
    fn mismatched_endpoints_revert() {
        let (mut mgr, id) = setup();
        let (c, _) = frontier(&mgr, &id);
        let err = mgr
            .bisect(&alice().staker, &c.id, &[hash(9), hash(5), c.end_commit], bn(101))
            .unwrap_err();
        assert!(matches!(err, ChallengeError::BadBisection(_)));
        let err = mgr
            .bisect(&alice().staker, &c.id, &[c.start_commit, hash(5), hash(9)], bn(101))
            .unwrap_err();
        assert!(matches!(err, ChallengeError::BadBisection(_)));
        let err = mgr
            .bisect(&alice().staker, &c.id, &[c.start_commit, c.end_commit], bn(101))
            .unwrap_err();
        assert!(matches!(err, ChallengeError::BadBisection(_)));

        assert_eq!(mgr.edge(&c.id).unwrap().status, EdgeStatus::Pending);
        assert_eq!(mgr.edges_of(&id).len(), 2);
        assert_eq!(mgr.current_responder(&id), Some(alice().staker));
    }

    #[test]
    fn asserter_cannot_move_first() {
        let (mut mgr, id) = setup();
        let (_, a) = frontier(&mgr, &id);
        let commits = [a.start_commit, hash(5), a.end_commit];
        let err = mgr.bisect(&bob().staker, &a.id, &commits, bn(101)).unwrap_err();
        assert!(matches!(err, ChallengeError::NotYourTurn { expected } if expected == alice().staker));
    }

    #[test]
    fn only_the_claimant_bisects() {
        let (mut mgr, id) = setup();
        let (c, _) = frontier(&mgr, &id);
        let commits = [c.start_commit, hash(5), c.end_commit];
        let err = mgr.bisect(&bob().staker, &c.id, &commits, bn(101)).unwrap_err();
        assert!(matches!(err, ChallengeError::NotClaimant { .. }));
    }

    #[test]
    fn late_move_is_rejected() {
        let (mut mgr, id) = setup();
        let err = bisect_awaited(&mut mgr, &id, 3, bn(111)).unwrap_err();
        assert!(matches!(err, ChallengeError::DeadlineExpired { deadline } if deadline == bn(110)));
    }

    #[test]
    fn disagreement_at_midpoint_keeps_lower_halves() {
        let (mut mgr, id) = setup();
        bisect_awaited(&mut mgr, &id, 3, bn(101)).unwrap();
        bisect_awaited(&mut mgr, &id, 3, bn(102)).unwrap();
        let (c, a) = frontier(&mgr, &id);
        assert_eq!((c.start_height, c.end_height), (0, 5));
        assert!(c.is_rival_of(&a));
        assert_eq!(mgr.current_responder(&id), Some(alice().staker));
        assert_eq!(c.deadline, bn(112));
    }

    #[test]
    fn agreement_at_midpoint_moves_to_upper_halves() {
        let (mut mgr, id) = setup();
        // Histories agree up to height 7, so the first midpoint (5) is shared.
        bisect_awaited(&mut mgr, &id, 7, bn(101)).unwrap();
        bisect_awaited(&mut mgr, &id, 7, bn(102)).unwrap();
        let (c, a) = frontier(&mgr, &id);
        assert_eq!((c.start_height, c.end_height), (5, 10));
        assert!(c.is_rival_of(&a));
    }

    #[test]
    fn unrivaled_children_have_no_rival() {
        let (mut mgr, id) = setup();
        let first = bisect_awaited(&mut mgr, &id, 3, bn(101)).unwrap();
        bisect_awaited(&mut mgr, &id, 3, bn(102)).unwrap();
        // The upper halves start from different midpoints.
        assert_eq!(mgr.rival_of(&first.upper), None);
        assert!(mgr.rival_of(&first.lower).is_some());
    }

    #[test]
    fn single_step_at_block_level_escalates() {
        let (mut mgr, id) = setup();
        // [0,10] -> [0,5] -> [2,5] -> [2,3]
        for now in 101..107 {
            bisect_awaited(&mut mgr, &id, 3, bn(now)).unwrap();
        }
        let (c, a) = frontier(&mgr, &id);
        assert_eq!(c.level, EdgeLevel::BigStep(0));
        assert!(c.is_rival_of(&a));
        let coarse = mgr.edge(&c.origin.unwrap()).unwrap();
        assert_eq!((coarse.start_height, coarse.end_height), (2, 3));
        assert_eq!(coarse.status, EdgeStatus::Escalated);
        assert_eq!(c.start_commit, coarse.start_commit);
        assert_eq!(c.end_commit, coarse.end_commit);
    }

    #[test]
    fn one_step_edge_cannot_be_bisected() {
        let (mut mgr, id) = setup();
        let now = play_to_one_step(&mut mgr, &id, 100);
        let (c, _) = frontier(&mgr, &id);
        let commits = [c.start_commit, hash(4), c.end_commit];
        let err = mgr
            .bisect(&alice().staker, &c.id, &commits, bn(now + 1))
            .unwrap_err();
        assert!(matches!(err, ChallengeError::CannotBisect { length: 1 }));
    }

    // --- timeout ---

    #[test]
    fn timeout_not_yet_before_deadline() {
        let (mut mgr, id) = setup();
        let result = mgr.timeout_challenge(&id, bn(110)).unwrap();
        assert_eq!(
            result,
            Crank::NotYet(NotYet::BeforeDeadline { deadline: bn(110) })
        );
        assert!(!mgr.is_timed_out(&id, bn(110)));
        assert!(mgr.challenge(&id).unwrap().is_active());
    }

    #[test]
    fn silent_asserter_loses_by_timeout() {
        let (mut mgr, id) = setup();
        let b = bisect_awaited(&mut mgr, &id, 3, bn(101)).unwrap();
        assert!(mgr.is_timed_out(&id, bn(112)));

        let outcome = mgr.timeout_challenge(&id, bn(112)).unwrap().done().unwrap();
        assert_eq!(outcome.winner, alice());
        assert_eq!(outcome.loser, bob());
        assert_eq!(outcome.reason, Resolution::Timeout);
        assert_eq!(mgr.current_responder(&id), None);

        let root_a = mgr.edges_of(&id)[1].clone();
        assert_eq!(root_a.claimant, bob().staker);
        assert_eq!(root_a.status, EdgeStatus::TimedOut);
        assert_eq!(mgr.edge(&b.lower).unwrap().status, EdgeStatus::Confirmed);
        assert_eq!(mgr.edge(&b.upper).unwrap().status, EdgeStatus::Confirmed);
        assert_eq!(mgr.edges_of(&id)[0].status, EdgeStatus::Confirmed);
    }

    #[test]
    fn timeout_targets_only_the_awaited_edge() {
        let (mut mgr, id) = setup();
        let (_, a) = frontier(&mgr, &id);
        let err = mgr.timeout(&a.id, bn(500)).unwrap_err();
        assert!(matches!(err, ChallengeError::EdgeNotAwaited(_)));
    }

    #[test]
    fn timeout_after_resolution_fails() {
        let (mut mgr, id) = setup();
        mgr.timeout_challenge(&id, bn(111)).unwrap();
        let err = mgr.timeout_challenge(&id, bn(200)).unwrap_err();
        assert!(matches!(err, ChallengeError::ChallengeNotActive(_)));
    }

    // --- one-step adjudication ---

    #[test]
    fn correct_claim_wins_one_step() {
        let (mut mgr, id) = setup();
        let now = play_to_one_step(&mut mgr, &id, 100);
        let (c, a) = frontier(&mgr, &id);
        assert!(c.is_one_step());

        let outcome = mgr
            .prove_one_step(&alice().staker, &c.id, c.end_commit.as_bytes(), &echo_verifier, bn(now + 1))
            .unwrap();
        assert_eq!(outcome.winner, alice());
        assert_eq!(outcome.reason, Resolution::OneStepProof);
        assert_eq!(mgr.edge(&a.id).unwrap().status, EdgeStatus::Refuted);
        assert_eq!(mgr.edge(&c.id).unwrap().status, EdgeStatus::Confirmed);
    }

    #[test]
    fn claimant_refuted_by_own_proof() {
        let (mut mgr, id) = setup();
        let now = play_to_one_step(&mut mgr, &id, 100);
        let (c, a) = frontier(&mgr, &id);

        // Bob proves, but the step lands on Alice's claim.
        let outcome = mgr
            .prove_one_step(&bob().staker, &a.id, c.end_commit.as_bytes(), &echo_verifier, bn(now + 1))
            .unwrap();
        assert_eq!(outcome.winner, alice());
        assert_eq!(mgr.edge(&a.id).unwrap().status, EdgeStatus::Refuted);
    }

    #[test]
    fn result_matching_neither_side_is_a_fault() {
        let (mut mgr, id) = setup();
        let now = play_to_one_step(&mut mgr, &id, 100);
        let (c, _) = frontier(&mgr, &id);

        let err = mgr
            .prove_one_step(&alice().staker, &c.id, hash(0x77).as_bytes(), &echo_verifier, bn(now + 1))
            .unwrap_err();
        assert!(matches!(err, ChallengeError::AdjudicationFault { .. }));
        assert!(mgr.challenge(&id).unwrap().is_active());
        assert_eq!(mgr.edge(&c.id).unwrap().status, EdgeStatus::Pending);
    }

    #[test]
    fn malformed_proof_reverts() {
        let (mut mgr, id) = setup();
        let now = play_to_one_step(&mut mgr, &id, 100);
        let (c, _) = frontier(&mgr, &id);
        let err = mgr
            .prove_one_step(&alice().staker, &c.id, b"short", &echo_verifier, bn(now + 1))
            .unwrap_err();
        assert!(matches!(err, ChallengeError::InvalidProof(_)));
    }

    #[test]
    fn proof_before_final_level_is_rejected() {
        let (mut mgr, id) = setup();
        let (c, _) = frontier(&mgr, &id);
        let err = mgr
            .prove_one_step(&alice().staker, &c.id, c.end_commit.as_bytes(), &echo_verifier, bn(101))
            .unwrap_err();
        assert!(matches!(err, ChallengeError::NotOneStep(_)));
    }

    #[test]
    fn full_game_stays_within_move_bound() {
        let (mut mgr, id) = setup();
        let now = play_to_one_step(&mut mgr, &id, 100);
        let (c, _) = frontier(&mgr, &id);
        mgr.prove_one_step(&alice().staker, &c.id, c.end_commit.as_bytes(), &echo_verifier, bn(now + 1))
            .unwrap();
        let moves = mgr.challenge(&id).unwrap().moves;
        assert_eq!(moves, 13);
        assert!(moves <= max_moves(&game()));
    }

    // --- cancellation and events ---

    #[test]
    fn cancel_clears_responder() {
        let (mut mgr, id) = setup();
        mgr.cancel(&id).unwrap();
        assert_eq!(mgr.current_responder(&id), None);
        assert_eq!(mgr.challenge(&id).unwrap().status, ChallengeStatus::Cancelled);
        assert!(matches!(mgr.cancel(&id), Err(ChallengeError::ChallengeNotActive(_))));
    }

    #[test]
    fn events_describe_every_new_edge() {
        let (mut mgr, id) = setup();
        let events = mgr.drain_events();
        assert!(matches!(events[0], GameEvent::ChallengeCreated { .. }));
        let added = events
            .iter()
            .filter(|e| matches!(e, GameEvent::EdgeAdded { .. }))
            .count();
        assert_eq!(added, 2);

        bisect_awaited(&mut mgr, &id, 3, bn(101)).unwrap();
        let events = mgr.drain_events();
        assert!(matches!(events[0], GameEvent::EdgeBisected { .. }));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::EdgeAdded { .. }))
                .count(),
            2
        );
        assert!(mgr.drain_events().is_empty());
    }

    #[test]
    fn challenge_ids_are_sequential() {
        let (mut mgr, first) = setup();
        let carol = Participant {
            staker: Address::new([0xc0; 20]),
            assertion: AssertionId::new(hash(0x0c)),
        };
        let second = mgr
            .create(carol, bob(), hash(1), hash(0xcc), hash(0xbb), 4, bn(100))
            .unwrap();
        assert_eq!(first.index(), 1);
        assert_eq!(second.index(), 2);
    }
}
