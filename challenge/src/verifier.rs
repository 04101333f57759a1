//! The one-step verifier seam.

use vigil_types::Bytes32;

use crate::error::ChallengeError;

/// Executes exactly one machine step from a committed state.
///
/// Implementations are pure: the same commitment and proof always yield the
/// same result. A malformed proof is reported as
/// [`ChallengeError::InvalidProof`].
pub trait OneStepVerifier {
    fn prove_one_step(&self, before: &Bytes32, proof: &[u8]) -> Result<Bytes32, ChallengeError>;
}

impl<F> OneStepVerifier for F
where
    F: Fn(&Bytes32, &[u8]) -> Result<Bytes32, ChallengeError>,
{
    fn prove_one_step(&self, before: &Bytes32, proof: &[u8]) -> Result<Bytes32, ChallengeError> {
        self(before, proof)
    }
}
