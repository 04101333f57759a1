//! The challenge game that settles disputes between sibling assertions.
//!
//! Two stakers who disagree about the execution between the same parent and
//! two different end states narrow their disagreement by repeated bisection:
//! 1. **Block level**: the claimed block range is halved until one block is left.
//! 2. **Big-step levels**: that block is refined into ranges of big steps.
//! 3. **Small-step level**: the last big step is refined into single machine
//!    steps, and one of them is re-executed by a [`OneStepVerifier`].
//!
//! Every move is bounded by a deadline, so a game always ends within
//! [`max_duration_blocks`].

pub mod bound;
pub mod edge;
pub mod error;
pub mod event;
pub mod level;
pub mod manager;
pub mod verifier;

pub use bound::{max_duration_blocks, max_moves};
pub use edge::{Edge, EdgeStatus};
pub use error::ChallengeError;
pub use event::GameEvent;
pub use level::EdgeLevel;
pub use manager::{
    Bisection, Challenge, ChallengeManager, ChallengeOutcome, ChallengeStatus, Participant,
    Resolution, Side,
};
pub use verifier::OneStepVerifier;
