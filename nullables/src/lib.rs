//! Nullable infrastructure for deterministic testing.
//!
//! Everything the rollup reads from outside itself (the host block height,
//! the message inbox, the one-step verifier, storage) sits behind a trait.
//! This crate provides implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network

pub mod clock;
pub mod inbox;
pub mod store;
pub mod verifier;

pub use clock::NullClock;
pub use inbox::NullInbox;
pub use store::NullStore;
pub use verifier::NullVerifier;
