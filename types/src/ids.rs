//! Identifiers for assertions, edges and challenges.
//!
//! Assertion and edge ids are content-addressed (see `vigil-crypto`), so they
//! are plain 32-byte wrappers here. Challenge ids are sequential.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::Bytes32;

/// Content-addressed identifier of an assertion.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssertionId(Bytes32);

impl AssertionId {
    pub const ZERO: Self = Self(Bytes32::ZERO);

    pub fn new(hash: Bytes32) -> Self {
        Self(hash)
    }

    pub fn as_hash(&self) -> &Bytes32 {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for AssertionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssertionId({})", hex::encode(&self.0.as_bytes()[..4]))
    }
}

impl fmt::Display for AssertionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content-addressed identifier of a challenge edge.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(Bytes32);

impl EdgeId {
    pub fn new(hash: Bytes32) -> Self {
        Self(hash)
    }

    pub fn as_hash(&self) -> &Bytes32 {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", hex::encode(&self.0.as_bytes()[..4]))
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential challenge index. Index 0 is never assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChallengeId(u64);

impl ChallengeId {
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    pub fn index(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "challenge#{}", self.0)
    }
}
