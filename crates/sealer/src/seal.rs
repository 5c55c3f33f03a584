//! Batch sealing and seal verification.
//!
//! Sealing is one atomic operation over the whole ordered batch: every
//! document gets the same merkle root, its own target hash and proof path,
//! and the issuer's signature over the root.

use serde_json::{json, Value};
use sigil_crypto::{hash, verify_signature, SigningKeypair};
use thiserror::Error;

use crate::fields::{is_sealed, unsealed_data};
use crate::merkle::{compute_merkle_root, merkle_proofs, verify_proof};

#[derive(Error, Debug)]
pub enum SealError {
    #[error("Batch is empty")]
    EmptyBatch,
    #[error("Document already sealed: {0}")]
    AlreadySealed(String),
    #[error("Document is not a JSON object: {0}")]
    NotAnObject(String),
    #[error("Document is not sealed")]
    NotSealed,
    #[error("Malformed seal: {0}")]
    Malformed(String),
    #[error("Target hash does not match document data")]
    HashMismatch,
    #[error("Merkle proof does not reach the root")]
    ProofInvalid,
    #[error("Seal signature invalid")]
    SignatureInvalid,
}

/// Output of sealing: the same documents, each carrying a `seal` object,
/// plus the shared root in hex.
#[derive(Debug, Clone)]
pub struct SealedBatch {
    pub documents: Vec<(String, Value)>,
    pub merkle_root: String,
}

/// The per-document leaf value: SHA-256 over the document minus its seal.
pub fn target_hash(doc: &Value) -> Result<[u8; 32], SealError> {
    let bytes = serde_json::to_vec(&unsealed_data(doc))
        .map_err(|e| SealError::Malformed(e.to_string()))?;
    Ok(hash(&bytes))
}

/// Seal an ordered batch of unsealed documents under one shared root.
pub fn seal(
    entries: Vec<(String, Value)>,
    issuer: &SigningKeypair,
) -> Result<SealedBatch, SealError> {
    if entries.is_empty() {
        return Err(SealError::EmptyBatch);
    }

    let mut hashes = Vec::with_capacity(entries.len());
    for (key, doc) in &entries {
        if !doc.is_object() {
            return Err(SealError::NotAnObject(key.clone()));
        }
        if is_sealed(doc) {
            return Err(SealError::AlreadySealed(key.clone()));
        }
        hashes.push(target_hash(doc)?);
    }

    let root = compute_merkle_root(&hashes);
    let proofs = merkle_proofs(&hashes);
    let signature = issuer.sign(&root);
    let issuer_key = issuer.public_key_bytes();

    let documents = entries
        .into_iter()
        .zip(hashes.iter().zip(proofs))
        .map(|((key, mut doc), (leaf, proof))| {
            let seal = json!({
                "targetHash": hex::encode(leaf),
                "proof": proof.iter().map(hex::encode).collect::<Vec<_>>(),
                "merkleRoot": hex::encode(root),
                "key": hex::encode(issuer_key),
                "signature": hex::encode(signature),
            });
            // is_object was checked above
            if let Some(obj) = doc.as_object_mut() {
                obj.insert("seal".to_string(), seal);
            }
            (key, doc)
        })
        .collect();

    Ok(SealedBatch {
        documents,
        merkle_root: hex::encode(root),
    })
}

/// Verify a sealed document end to end: target hash matches the data, the
/// proof path folds to the root, and the issuer signature over the root
/// holds.
pub fn verify_seal(doc: &Value) -> Result<(), SealError> {
    let seal = doc.get("seal").ok_or(SealError::NotSealed)?;

    let target: [u8; 32] = decode_hex(seal, "targetHash")?;
    let root: [u8; 32] = decode_hex(seal, "merkleRoot")?;
    let key: [u8; 32] = decode_hex(seal, "key")?;
    let signature: [u8; 64] = decode_hex(seal, "signature")?;

    let proof = seal
        .get("proof")
        .and_then(Value::as_array)
        .ok_or_else(|| SealError::Malformed("proof".to_string()))?
        .iter()
        .map(|node| {
            node.as_str()
                .and_then(|s| hex::decode(s).ok())
                .and_then(|b| <[u8; 32]>::try_from(b).ok())
                .ok_or_else(|| SealError::Malformed("proof".to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if target != target_hash(doc)? {
        return Err(SealError::HashMismatch);
    }
    if !verify_proof(&target, &proof, &root) {
        return Err(SealError::ProofInvalid);
    }
    if !verify_signature(&key, &root, &signature) {
        return Err(SealError::SignatureInvalid);
    }
    Ok(())
}

/// The sealed document's target hash, as hex.
pub fn sealed_target_hash(doc: &Value) -> Option<String> {
    doc.pointer("/seal/targetHash")?.as_str().map(str::to_string)
}

/// The sealed document's shared merkle root, as hex.
pub fn sealed_merkle_root(doc: &Value) -> Option<String> {
    doc.pointer("/seal/merkleRoot")?.as_str().map(str::to_string)
}

fn decode_hex<const N: usize>(seal: &Value, field: &str) -> Result<[u8; N], SealError> {
    seal.get(field)
        .and_then(Value::as_str)
        .and_then(|s| hex::decode(s).ok())
        .and_then(|b| <[u8; N]>::try_from(b).ok())
        .ok_or_else(|| SealError::Malformed(field.to_string()))
}
