//! Domain-separated commitments over rollup state.
//!
//! Every hash starts with a distinct ASCII prefix so that a preimage of one
//! kind can never be replayed as another kind.

use vigil_types::{
    Address, AssertionId, Bytes32, ChallengeId, EdgeId, ExecutionState, GlobalState,
    MachineStatus,
};

use crate::hash::hash_parts;

const GLOBAL_STATE_PREFIX: &[u8] = b"Global state:";
const FINISHED_PREFIX: &[u8] = b"Block state:";
const ERRORED_PREFIX: &[u8] = b"Block state, errored:";
const RUNNING_PREFIX: &[u8] = b"Block state, running:";
const EXECUTION_PREFIX: &[u8] = b"Execution:";
const ASSERTION_PREFIX: &[u8] = b"Assertion:";
const CONFIRM_PREFIX: &[u8] = b"Confirm:";
const MUTUAL_PREFIX: &[u8] = b"Edge mutual:";
const EDGE_PREFIX: &[u8] = b"Edge:";

/// Hash of the L2 global state.
pub fn global_state_hash(gs: &GlobalState) -> Bytes32 {
    hash_parts(&[
        GLOBAL_STATE_PREFIX,
        gs.block_hash.as_bytes(),
        gs.send_root.as_bytes(),
        &gs.inbox_position.to_be_bytes(),
        &gs.position_in_message.to_be_bytes(),
    ])
}

/// Hash of an execution state: the global state tagged with the machine status.
///
/// This is the commitment a challenge edge starts from.
pub fn execution_state_hash(state: &ExecutionState) -> Bytes32 {
    let prefix = match state.machine_status {
        MachineStatus::Finished => FINISHED_PREFIX,
        MachineStatus::Errored => ERRORED_PREFIX,
        MachineStatus::Running => RUNNING_PREFIX,
    };
    hash_parts(&[prefix, global_state_hash(&state.global_state).as_bytes()])
}

/// Commitment to an assertion's claimed outcome: its after-state and step count.
pub fn execution_hash(after_state: &ExecutionState, num_steps: u64) -> Bytes32 {
    hash_parts(&[
        EXECUTION_PREFIX,
        execution_state_hash(after_state).as_bytes(),
        &num_steps.to_be_bytes(),
    ])
}

/// Content-addressed assertion id.
pub fn assertion_id(
    has_sibling: bool,
    parent: &AssertionId,
    execution_hash: &Bytes32,
    inbox_accumulator: &Bytes32,
    extra_root: &Bytes32,
) -> AssertionId {
    AssertionId::new(hash_parts(&[
        ASSERTION_PREFIX,
        &[has_sibling as u8],
        parent.as_bytes(),
        execution_hash.as_bytes(),
        inbox_accumulator.as_bytes(),
        extra_root.as_bytes(),
    ]))
}

/// Data recorded when an assertion is confirmed, consumed by the outbox.
pub fn confirm_data(block_hash: &Bytes32, send_root: &Bytes32) -> Bytes32 {
    hash_parts(&[CONFIRM_PREFIX, block_hash.as_bytes(), send_root.as_bytes()])
}

/// Identity shared by rival edges: everything except the end commitment and claimant.
pub fn mutual_id(
    challenge: ChallengeId,
    level_tag: [u8; 2],
    start_height: u64,
    end_height: u64,
    start_commit: &Bytes32,
) -> Bytes32 {
    hash_parts(&[
        MUTUAL_PREFIX,
        &challenge.index().to_be_bytes(),
        &level_tag,
        &start_height.to_be_bytes(),
        &end_height.to_be_bytes(),
        start_commit.as_bytes(),
    ])
}

/// Edge id: the mutual id extended with the claimed end commitment and claimant.
pub fn edge_id(mutual: &Bytes32, end_commit: &Bytes32, claimant: &Address) -> EdgeId {
    EdgeId::new(hash_parts(&[
        EDGE_PREFIX,
        mutual.as_bytes(),
        end_commit.as_bytes(),
        claimant.as_bytes(),
    ]))
}
