//! Claimed L2 execution state.

use serde::{Deserialize, Serialize};

use crate::hash::Bytes32;

/// Status of the L2 state machine at the end of an assertion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineStatus {
    #[default]
    Running,
    Finished,
    Errored,
}

impl MachineStatus {
    /// Byte tag used when a status is hashed.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Finished => 1,
            Self::Errored => 2,
        }
    }
}

/// The L2 global state: chain tip and the inbox read cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalState {
    pub block_hash: Bytes32,
    pub send_root: Bytes32,
    /// Index of the inbox message (batch) currently being read.
    pub inbox_position: u64,
    /// Position inside that message.
    pub position_in_message: u64,
}

impl GlobalState {
    /// Compare read cursors. `Greater` means `self` has consumed more input.
    pub fn compare_positions(&self, other: &GlobalState) -> std::cmp::Ordering {
        (self.inbox_position, self.position_in_message)
            .cmp(&(other.inbox_position, other.position_in_message))
    }

    /// Number of inbox messages this state has (at least partially) read.
    ///
    /// A message that has been started counts as read: the next state cannot
    /// be computed without it.
    pub fn messages_read(&self) -> u64 {
        if self.position_in_message > 0 {
            self.inbox_position.saturating_add(1)
        } else {
            self.inbox_position
        }
    }
}

/// A claimed L2 state after consuming a prefix of the inbox.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionState {
    pub global_state: GlobalState,
    pub machine_status: MachineStatus,
}

impl ExecutionState {
    pub fn new(global_state: GlobalState, machine_status: MachineStatus) -> Self {
        Self {
            global_state,
            machine_status,
        }
    }

    /// The finished state at inbox position zero used for genesis.
    pub fn genesis() -> Self {
        Self {
            global_state: GlobalState::default(),
            machine_status: MachineStatus::Finished,
        }
    }

    /// Inbox messages this state requires to have been delivered.
    pub fn required_messages(&self) -> u64 {
        if self.machine_status == MachineStatus::Errored {
            self.global_state.inbox_position.saturating_add(1)
        } else {
            self.global_state.messages_read()
        }
    }
}
