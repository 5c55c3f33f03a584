//! Sigil Core
//!
//! Generic types and the retry combinator shared by all Sigil crates.

pub mod retry;

use serde::{Deserialize, Serialize};

pub use retry::{retry_fixed, RetryPolicy, Transient};

/// Ledger-side document store address (`0x`-prefixed hex).
pub type Address = String;

/// The two ledger-facing operations a worker can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Issue,
    Revoke,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::Revoke => "revoke",
        }
    }
}

/// Document schema versions the workers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    V2,
    V3,
}

impl SchemaVersion {
    /// The `version` field value a document of this schema declares.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::V2 => "2.0",
            Self::V3 => "3.0",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "2.0" => Some(Self::V2),
            "3.0" => Some(Self::V3),
            _ => None,
        }
    }
}
