//! Span constructors for node operations, so traces share names and fields.

use tracing::{info_span, Span};

use vigil_types::{BlockNumber, ChallengeId};

/// One crank tick at host height `now`.
pub fn crank_tick_span(now: BlockNumber) -> Span {
    info_span!("crank_tick", now = %now)
}

/// A caller-submitted chain operation such as staking on an assertion.
pub fn submit_span(op: &str, now: BlockNumber) -> Span {
    info_span!("submit", op = %op, now = %now)
}

/// A move in a challenge: a bisection, a proof or a timeout.
pub fn challenge_move_span(challenge: &ChallengeId, op: &str) -> Span {
    info_span!("challenge_move", challenge = %challenge, op = %op)
}
