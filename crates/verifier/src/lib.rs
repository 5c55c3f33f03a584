//! Sigil Verifier
//!
//! Per-document verification, polymorphic over {issue, revoke} ×
//! {v2, v3}. Each worker instance selects one verifier from configuration
//! and applies it to every candidate document. Checks short-circuit on the
//! first failure and produce a human-readable reason that is written, with
//! the rejected document, to the invalid store.
//!
//! A permanent rejection is a [`Verdict::Invalid`] value; only transient
//! causes (the ledger revocation probe failing) surface as errors, which
//! the calling stage retries at its own level.

use serde_json::{json, Value};
use sigil_core::{Address, Operation, SchemaVersion, Transient};
use sigil_ledger::{LedgerClient, LedgerError};
use sigil_sealer as sealer;
use sigil_sealer::SealError;
use thiserror::Error;
use tracing::debug;

/// Reason attached to documents whose body does not parse as JSON.
/// Raised by the pipeline stages before a verifier ever runs.
pub const REASON_NOT_JSON: &str = "Document body is not a valid JSON";

#[derive(Error, Debug)]
pub enum VerifierError {
    #[error("Ledger error during verification: {0}")]
    Ledger(#[from] LedgerError),
}

impl Transient for VerifierError {
    fn is_transient(&self) -> bool {
        match self {
            VerifierError::Ledger(e) => e.is_transient(),
        }
    }
}

/// Outcome of verifying one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid {
        reason: String,
        /// Structured validation detail for logging and the reason sidecar.
        detail: Option<Value>,
    },
}

impl Verdict {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Verdict::Invalid {
            reason: reason.into(),
            detail: None,
        }
    }

    pub fn invalid_with_detail(reason: impl Into<String>, detail: Value) -> Self {
        Verdict::Invalid {
            reason: reason.into(),
            detail: Some(detail),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

/// One worker's document verifier: a fixed (operation, schema version,
/// target store address) triple chosen at startup.
#[derive(Debug, Clone)]
pub struct DocumentVerifier {
    operation: Operation,
    version: SchemaVersion,
    store_address: Address,
}

impl DocumentVerifier {
    pub fn new(operation: Operation, version: SchemaVersion, store_address: Address) -> Self {
        Self {
            operation,
            version,
            store_address,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Verify one parsed document. Short-circuits on the first failed
    /// check. The ledger is consulted only on the revoke path.
    pub async fn verify(
        &self,
        doc: &Value,
        ledger: &dyn LedgerClient,
    ) -> Result<Verdict, VerifierError> {
        // Declared version must match this worker's.
        if sealer::schema_version(doc) != Some(self.version) {
            return Ok(self.reject(Verdict::invalid("Invalid document version")));
        }

        let verdict = match self.operation {
            Operation::Issue => self.verify_issue(doc),
            Operation::Revoke => self.verify_revoke(doc, ledger).await?,
        };
        Ok(self.reject(verdict))
    }

    fn verify_issue(&self, doc: &Value) -> Verdict {
        if sealer::is_sealed(doc) {
            return Verdict::invalid("Document is wrapped");
        }

        let errors = sealer::schema_errors(doc, self.version);
        if !errors.is_empty() {
            return Verdict::invalid_with_detail("Invalid document schema", json!(errors));
        }

        self.check_store_address(doc)
    }

    async fn verify_revoke(
        &self,
        doc: &Value,
        ledger: &dyn LedgerClient,
    ) -> Result<Verdict, VerifierError> {
        if !sealer::is_sealed(doc) {
            return Ok(Verdict::invalid("Document not wrapped"));
        }

        let mut errors = sealer::schema_errors(doc, self.version);
        errors.extend(sealer::seal_errors(doc));
        if !errors.is_empty() {
            return Ok(Verdict::invalid_with_detail(
                "Invalid document schema",
                json!(errors),
            ));
        }

        match sealer::verify_seal(doc) {
            Ok(()) => {}
            Err(
                SealError::HashMismatch | SealError::ProofInvalid | SealError::SignatureInvalid,
            ) => return Ok(Verdict::invalid("Invalid document signature")),
            Err(e) => {
                return Ok(Verdict::invalid_with_detail(
                    "Invalid document schema",
                    json!([e.to_string()]),
                ))
            }
        }

        if !sealer::is_revocable(doc, self.version) {
            return Ok(Verdict::invalid("Document not revocable"));
        }

        if let Verdict::Invalid { reason, detail } = self.check_store_address(doc) {
            return Ok(Verdict::Invalid { reason, detail });
        }

        // seal_errors verified targetHash is a string above.
        let target = sealer::sealed_target_hash(doc).unwrap_or_default();
        if ledger.is_revoked(&target).await? {
            return Ok(Verdict::invalid(format!(
                "Document {target} already revoked"
            )));
        }

        Ok(Verdict::Valid)
    }

    /// The document's declared store address must equal the worker's
    /// configured target.
    fn check_store_address(&self, doc: &Value) -> Verdict {
        let declared = sealer::document_store_address(doc, self.version)
            .unwrap_or_else(|| "none".to_string());
        if declared != self.store_address {
            return Verdict::invalid(format!(
                "Invalid document store address. Expected: {}. Got: {}",
                self.store_address, declared
            ));
        }
        Verdict::Valid
    }

    fn reject(&self, verdict: Verdict) -> Verdict {
        if let Verdict::Invalid { reason, .. } = &verdict {
            debug!(
                operation = self.operation.name(),
                reason, "document rejected"
            );
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_crypto::SigningKeypair;
    use sigil_ledger::MemoryLedger;

    const STORE: &str = "0xabc123";

    fn v2_unwrapped(store: &str) -> Value {
        json!({
            "version": "2.0",
            "data": {
                "name": "certificate-1",
                "issuer": { "documentStore": store },
                "revocable": true
            }
        })
    }

    fn v3_unwrapped(store: &str) -> Value {
        json!({
            "version": "3.0",
            "credential": { "name": "certificate-1" },
            "proof": { "method": "documentStore", "value": store, "revocable": true }
        })
    }

    fn sealed(doc: Value) -> Value {
        let issuer = SigningKeypair::generate();
        let batch = sealer::seal(vec![("doc".to_string(), doc)], &issuer).unwrap();
        batch.documents.into_iter().next().unwrap().1
    }

    fn issue_v2() -> DocumentVerifier {
        DocumentVerifier::new(Operation::Issue, SchemaVersion::V2, STORE.to_string())
    }

    fn revoke_v2() -> DocumentVerifier {
        DocumentVerifier::new(Operation::Revoke, SchemaVersion::V2, STORE.to_string())
    }

    #[tokio::test]
    async fn test_issue_accepts_valid_document() {
        let ledger = MemoryLedger::new();
        let verdict = issue_v2()
            .verify(&v2_unwrapped(STORE), &ledger)
            .await
            .unwrap();
        assert!(verdict.is_valid());
    }

    #[tokio::test]
    async fn test_issue_v3_accepts_valid_document() {
        let ledger = MemoryLedger::new();
        let verifier =
            DocumentVerifier::new(Operation::Issue, SchemaVersion::V3, STORE.to_string());
        let verdict = verifier
            .verify(&v3_unwrapped(STORE), &ledger)
            .await
            .unwrap();
        assert!(verdict.is_valid());
    }

    #[tokio::test]
    async fn test_wrong_version_rejected() {
        let ledger = MemoryLedger::new();
        let verdict = issue_v2()
            .verify(&v3_unwrapped(STORE), &ledger)
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::invalid("Invalid document version"));
    }

    #[tokio::test]
    async fn test_issue_rejects_wrapped_document() {
        let ledger = MemoryLedger::new();
        let verdict = issue_v2()
            .verify(&sealed(v2_unwrapped(STORE)), &ledger)
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::invalid("Document is wrapped"));
    }

    #[tokio::test]
    async fn test_issue_rejects_bad_schema_with_detail() {
        let ledger = MemoryLedger::new();
        let verdict = issue_v2()
            .verify(&json!({"version": "2.0"}), &ledger)
            .await
            .unwrap();
        match verdict {
            Verdict::Invalid { reason, detail } => {
                assert_eq!(reason, "Invalid document schema");
                assert!(detail.is_some());
            }
            Verdict::Valid => panic!("expected rejection"),
        }
    }

    #[tokio::test]
    async fn test_foreign_store_address_rejected() {
        let ledger = MemoryLedger::new();
        let verdict = issue_v2()
            .verify(&v2_unwrapped("0xother"), &ledger)
            .await
            .unwrap();
        assert_eq!(
            verdict,
            Verdict::invalid("Invalid document store address. Expected: 0xabc123. Got: 0xother")
        );
    }

    #[tokio::test]
    async fn test_revoke_rejects_unwrapped() {
        let ledger = MemoryLedger::new();
        let verdict = revoke_v2()
            .verify(&v2_unwrapped(STORE), &ledger)
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::invalid("Document not wrapped"));
    }

    #[tokio::test]
    async fn test_revoke_accepts_sealed_revocable() {
        let ledger = MemoryLedger::new();
        let verdict = revoke_v2()
            .verify(&sealed(v2_unwrapped(STORE)), &ledger)
            .await
            .unwrap();
        assert!(verdict.is_valid());
    }

    #[tokio::test]
    async fn test_revoke_rejects_tampered_signature() {
        let ledger = MemoryLedger::new();
        let mut doc = sealed(v2_unwrapped(STORE));
        doc["data"]["name"] = json!("tampered");
        let verdict = revoke_v2().verify(&doc, &ledger).await.unwrap();
        assert_eq!(verdict, Verdict::invalid("Invalid document signature"));
    }

    #[tokio::test]
    async fn test_revoke_rejects_non_revocable() {
        let ledger = MemoryLedger::new();
        let mut doc = v2_unwrapped(STORE);
        doc["data"]["revocable"] = json!(false);
        let verdict = revoke_v2().verify(&sealed(doc), &ledger).await.unwrap();
        assert_eq!(verdict, Verdict::invalid("Document not revocable"));
    }

    #[tokio::test]
    async fn test_already_revoked_rejected() {
        let ledger = MemoryLedger::new();
        let doc = sealed(v2_unwrapped(STORE));
        let target = sealer::sealed_target_hash(&doc).unwrap();
        ledger.mark_revoked(&target);

        let verdict = revoke_v2().verify(&doc, &ledger).await.unwrap();
        assert_eq!(
            verdict,
            Verdict::invalid(format!("Document {target} already revoked"))
        );
    }

    #[tokio::test]
    async fn test_ledger_failure_is_transient_error() {
        let ledger = MemoryLedger::new();
        ledger.fail_next_rpc(1);
        let doc = sealed(v2_unwrapped(STORE));

        let result = revoke_v2().verify(&doc, &ledger).await;
        match result {
            Err(e) => assert!(e.is_transient()),
            Ok(_) => panic!("expected transient error"),
        }
    }
}
