//! Sigil Crypto
//!
//! Pure cryptographic primitives shared by all Sigil crates.
//! No dependency on any protocol-specific types.

pub mod keys;

pub use keys::{hash, verify_signature, SigningKeypair};
