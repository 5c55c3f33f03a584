//! Sigil Sealer
//!
//! The cryptographic commitment boundary of the pipeline: computes
//! per-document target hashes, seals a whole batch under one shared merkle
//! root (issue path), and verifies seals on already-wrapped documents
//! (revoke path). Also owns the version-specific document field rules.

pub mod fields;
pub mod merkle;
pub mod seal;

pub use fields::{
    document_store_address, is_revocable, is_sealed, schema_errors, schema_version, seal_errors,
    unsealed_data, V3_PROOF_METHOD,
};
pub use merkle::{compute_merkle_root, merkle_proofs, verify_proof};
pub use seal::{
    seal, sealed_merkle_root, sealed_target_hash, target_hash, verify_seal, SealError, SealedBatch,
};
