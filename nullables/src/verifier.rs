//! Nullable one-step verifier.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use vigil_challenge::{ChallengeError, OneStepVerifier};
use vigil_types::Bytes32;

/// A verifier driven by a table of known transitions.
///
/// A `before` commitment found in the table steps to its recorded `after`.
/// Any other commitment steps to whatever 32-byte value the proof carries,
/// so a test can dictate the outcome of an arbitrary step.
#[derive(Debug, Default)]
pub struct NullVerifier {
    transitions: HashMap<Bytes32, Bytes32>,
    calls: AtomicU64,
}

impl NullVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that one step from `before` yields `after`.
    pub fn with_transition(mut self, before: Bytes32, after: Bytes32) -> Self {
        self.transitions.insert(before, after);
        self
    }

    /// How many proofs have been checked.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OneStepVerifier for NullVerifier {
    fn prove_one_step(&self, before: &Bytes32, proof: &[u8]) -> Result<Bytes32, ChallengeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(after) = self.transitions.get(before) {
            return Ok(*after);
        }
        let bytes = <[u8; 32]>::try_from(proof).map_err(|_| {
            ChallengeError::InvalidProof(format!("expected 32 bytes, got {}", proof.len()))
        })?;
        Ok(Bytes32::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_transition_wins_over_proof() {
        let before = Bytes32::new([1; 32]);
        let after = Bytes32::new([2; 32]);
        let verifier = NullVerifier::new().with_transition(before, after);
        assert_eq!(verifier.prove_one_step(&before, &[9; 32]).unwrap(), after);
        assert_eq!(verifier.calls(), 1);
    }

    #[test]
    fn unknown_state_echoes_the_proof() {
        let verifier = NullVerifier::new();
        let out = verifier
            .prove_one_step(&Bytes32::ZERO, &[7; 32])
            .unwrap();
        assert_eq!(out, Bytes32::new([7; 32]));
        assert!(matches!(
            verifier.prove_one_step(&Bytes32::ZERO, &[7; 3]),
            Err(ChallengeError::InvalidProof(_))
        ));
        assert_eq!(verifier.calls(), 2);
    }
}
