use proptest::prelude::*;

use vigil_challenge::{max_moves, ChallengeManager, Edge, EdgeStatus, Participant};
use vigil_types::{Address, AssertionId, BlockNumber, Bytes32, GameParams};

fn game() -> GameParams {
    GameParams {
        block_leaf_size: 32,
        big_step_leaf_size: 8,
        small_step_leaf_size: 4,
        num_big_step_levels: 2,
        round_timeout_blocks: 5,
    }
}

fn player(byte: u8) -> Participant {
    Participant {
        staker: Address::new([byte; 20]),
        assertion: AssertionId::new(Bytes32::new([byte; 32])),
    }
}

/// `agree` decides, per move, whether the midpoint is shared by both sides.
fn mid_commit(edge: &Edge, shared: bool) -> Bytes32 {
    let mid = edge.start_height + edge.length() / 2;
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&mid.to_be_bytes());
    bytes[8..10].copy_from_slice(&edge.level.tag());
    bytes[10..18].copy_from_slice(&edge.start_height.to_be_bytes());
    if !shared {
        bytes[18..].copy_from_slice(&edge.claimant.as_bytes()[..14]);
    }
    Bytes32::new(bytes)
}

proptest! {
    /// Children of a bisection tile the parent and share the midpoint.
    #[test]
    fn bisection_tiles_parent(
        num_steps in 2u64..=32,
        agree in prop::collection::vec(any::<bool>(), 64),
    ) {
        let mut mgr = ChallengeManager::new(game());
        let id = mgr.create(
            player(1), player(2),
            Bytes32::new([7; 32]), Bytes32::new([8; 32]), Bytes32::new([9; 32]),
            num_steps, BlockNumber::new(10),
        ).unwrap();

        let mut now = 10;
        let mut round = 0;
        loop {
            let edge = mgr.awaited_edge(&id).unwrap().unwrap().clone();
            if edge.is_one_step() {
                break;
            }
            now += 1;
            // Both sides use the same agreement bit within a round.
            let shared = agree[(round / 2) % agree.len()];
            let mid = mid_commit(&edge, shared);
            let b = mgr.bisect(&edge.claimant, &edge.id, &[edge.start_commit, mid, edge.end_commit], BlockNumber::new(now)).unwrap();
            round += 1;

            let lower = mgr.edge(&b.lower).unwrap();
            let upper = mgr.edge(&b.upper).unwrap();
            prop_assert_eq!(lower.length() + upper.length(), edge.length());
            prop_assert_eq!(lower.start_height, edge.start_height);
            prop_assert_eq!(upper.end_height, edge.end_height);
            prop_assert_eq!(lower.end_height, upper.start_height);
            prop_assert_eq!(lower.end_commit, upper.start_commit);
            prop_assert_eq!(mgr.edge(&edge.id).unwrap().status, EdgeStatus::Bisected);
        }
        prop_assert!(mgr.challenge(&id).unwrap().moves <= max_moves(&game()));
    }

    /// Whoever goes silent loses, and the game never needs more moves than the bound.
    #[test]
    fn silence_ends_the_game(
        num_steps in 1u64..=32,
        silent_after in 0usize..40,
    ) {
        let mut mgr = ChallengeManager::new(game());
        let id = mgr.create(
            player(1), player(2),
            Bytes32::new([7; 32]), Bytes32::new([8; 32]), Bytes32::new([9; 32]),
            num_steps, BlockNumber::new(0),
        ).unwrap();

        let mut now = 0;
        for _ in 0..silent_after {
            let edge = mgr.awaited_edge(&id).unwrap().unwrap().clone();
            if edge.is_one_step() {
                break;
            }
            now += 1;
            let mid = mid_commit(&edge, false);
            mgr.bisect(&edge.claimant, &edge.id, &[edge.start_commit, mid, edge.end_commit], BlockNumber::new(now)).unwrap();
        }

        let silent = mgr.current_responder(&id).unwrap();
        let deadline = mgr.awaited_edge(&id).unwrap().unwrap().deadline;
        prop_assert!(!mgr.is_timed_out(&id, deadline));
        let outcome = mgr
            .timeout_challenge(&id, BlockNumber::new(deadline.as_u64() + 1))
            .unwrap()
            .done()
            .unwrap();
        prop_assert_eq!(outcome.loser.staker, silent);
        prop_assert_ne!(outcome.winner.staker, silent);
        prop_assert!(mgr.current_responder(&id).is_none());
        prop_assert!(mgr.challenge(&id).unwrap().moves < max_moves(&game()));
    }
}
