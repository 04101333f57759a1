//! Result type for permissionless crank calls.
//!
//! Cranks (`timeout`, `confirm_next_assertion`, `reject_next_assertion`) may be
//! called by anyone on a timer. Calling one before its time-based
//! precondition holds is not an error: it is a no-op that says why.

use serde::{Deserialize, Serialize};

use crate::time::BlockNumber;

/// Why a crank call did nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotYet {
    /// The relevant deadline has not been reached.
    BeforeDeadline { deadline: BlockNumber },
    /// The parent's first child is still inside its own confirm window.
    ChildTooRecent { ready_at: BlockNumber },
    /// There is nothing to act on.
    NothingPending,
}

/// Outcome of a crank call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crank<T> {
    Done(T),
    NotYet(NotYet),
}

impl<T> Crank<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(v) => Some(v),
            Self::NotYet(_) => None,
        }
    }
}
