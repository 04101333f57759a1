//! Hashing and commitments for the vigil rollup.
//!
//! - **Blake2b-256** for every hash
//! - Domain-separated commitments for global/execution state, assertion ids,
//!   confirm data, and challenge edge ids

pub mod commitment;
pub mod hash;

pub use commitment::{
    assertion_id, confirm_data, edge_id, execution_hash, execution_state_hash,
    global_state_hash, mutual_id,
};
pub use hash::{blake2b_256, blake2b_256_multi, hash_parts};
