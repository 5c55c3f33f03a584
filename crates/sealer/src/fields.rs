//! Version-specific document field access.
//!
//! v2 keeps its payload under `data` and the store address at
//! `data.issuer.documentStore`; v3 keeps a `credential` plus a `proof`
//! block with `method`/`value`/`revocable`. A sealed document of either
//! version carries a top-level `seal` object.

use serde_json::Value;
use sigil_core::SchemaVersion;

/// The `proof.method` value v3 documents must declare.
pub const V3_PROOF_METHOD: &str = "documentStore";

/// The schema version a document declares, if recognized.
pub fn schema_version(doc: &Value) -> Option<SchemaVersion> {
    doc.get("version")?.as_str().and_then(SchemaVersion::from_tag)
}

/// Whether the document carries a seal object.
pub fn is_sealed(doc: &Value) -> bool {
    doc.get("seal").is_some_and(Value::is_object)
}

/// The document minus its seal: the bytes that were committed to.
pub fn unsealed_data(doc: &Value) -> Value {
    let mut data = doc.clone();
    if let Some(obj) = data.as_object_mut() {
        obj.remove("seal");
    }
    data
}

/// The ledger document-store address the document claims, by
/// version-specific rules.
pub fn document_store_address(doc: &Value, version: SchemaVersion) -> Option<String> {
    match version {
        SchemaVersion::V2 => doc
            .pointer("/data/issuer/documentStore")?
            .as_str()
            .map(str::to_string),
        SchemaVersion::V3 => {
            let proof = doc.get("proof")?;
            if proof.get("method")?.as_str()? != V3_PROOF_METHOD {
                return None;
            }
            proof.get("value")?.as_str().map(str::to_string)
        }
    }
}

/// Whether the document declares itself revocable.
pub fn is_revocable(doc: &Value, version: SchemaVersion) -> bool {
    let pointer = match version {
        SchemaVersion::V2 => "/data/revocable",
        SchemaVersion::V3 => "/proof/revocable",
    };
    doc.pointer(pointer).and_then(Value::as_bool).unwrap_or(false)
}

/// Structural problems with the unsealed form of the document.
/// Empty means the structure is valid for its version.
pub fn schema_errors(doc: &Value, version: SchemaVersion) -> Vec<String> {
    let mut errors = Vec::new();
    match version {
        SchemaVersion::V2 => {
            if !doc.get("data").is_some_and(Value::is_object) {
                errors.push("missing object field: data".to_string());
            }
            if !doc
                .pointer("/data/issuer/documentStore")
                .is_some_and(Value::is_string)
            {
                errors.push("missing string field: data.issuer.documentStore".to_string());
            }
        }
        SchemaVersion::V3 => {
            if !doc.get("credential").is_some_and(Value::is_object) {
                errors.push("missing object field: credential".to_string());
            }
            match doc.get("proof") {
                Some(proof) if proof.is_object() => {
                    if proof.get("method").and_then(Value::as_str) != Some(V3_PROOF_METHOD) {
                        errors.push(format!("proof.method must be \"{V3_PROOF_METHOD}\""));
                    }
                    if !proof.get("value").is_some_and(Value::is_string) {
                        errors.push("missing string field: proof.value".to_string());
                    }
                }
                _ => errors.push("missing object field: proof".to_string()),
            }
        }
    }
    errors
}

/// Structural problems with the seal object itself.
pub fn seal_errors(doc: &Value) -> Vec<String> {
    let Some(seal) = doc.get("seal").filter(|s| s.is_object()) else {
        return vec!["missing object field: seal".to_string()];
    };
    let mut errors = Vec::new();
    for field in ["targetHash", "merkleRoot", "key", "signature"] {
        if !seal.get(field).is_some_and(Value::is_string) {
            errors.push(format!("missing string field: seal.{field}"));
        }
    }
    if !seal.get("proof").is_some_and(Value::is_array) {
        errors.push("missing array field: seal.proof".to_string());
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v2_doc(store: &str) -> Value {
        json!({
            "version": "2.0",
            "data": {
                "name": "certificate",
                "issuer": { "documentStore": store },
                "revocable": true
            }
        })
    }

    fn v3_doc(store: &str) -> Value {
        json!({
            "version": "3.0",
            "credential": { "name": "certificate" },
            "proof": { "method": "documentStore", "value": store, "revocable": false }
        })
    }

    #[test]
    fn test_schema_version() {
        assert_eq!(schema_version(&v2_doc("0xaa")), Some(SchemaVersion::V2));
        assert_eq!(schema_version(&v3_doc("0xaa")), Some(SchemaVersion::V3));
        assert_eq!(schema_version(&json!({"version": "9.9"})), None);
        assert_eq!(schema_version(&json!({})), None);
    }

    #[test]
    fn test_store_address_per_version() {
        assert_eq!(
            document_store_address(&v2_doc("0xaa"), SchemaVersion::V2).as_deref(),
            Some("0xaa")
        );
        assert_eq!(
            document_store_address(&v3_doc("0xbb"), SchemaVersion::V3).as_deref(),
            Some("0xbb")
        );

        // Wrong proof method yields no address.
        let mut doc = v3_doc("0xbb");
        doc["proof"]["method"] = json!("did");
        assert_eq!(document_store_address(&doc, SchemaVersion::V3), None);
    }

    #[test]
    fn test_revocable_flag() {
        assert!(is_revocable(&v2_doc("0xaa"), SchemaVersion::V2));
        assert!(!is_revocable(&v3_doc("0xaa"), SchemaVersion::V3));
        assert!(!is_revocable(&json!({}), SchemaVersion::V2));
    }

    #[test]
    fn test_schema_errors() {
        assert!(schema_errors(&v2_doc("0xaa"), SchemaVersion::V2).is_empty());
        assert!(schema_errors(&v3_doc("0xaa"), SchemaVersion::V3).is_empty());

        let errors = schema_errors(&json!({"version": "2.0"}), SchemaVersion::V2);
        assert_eq!(errors.len(), 2);

        let errors = schema_errors(&json!({"version": "3.0"}), SchemaVersion::V3);
        assert!(errors.iter().any(|e| e.contains("credential")));
    }

    #[test]
    fn test_unsealed_data_strips_seal() {
        let mut doc = v2_doc("0xaa");
        doc["seal"] = json!({"targetHash": "00"});
        assert!(is_sealed(&doc));
        let data = unsealed_data(&doc);
        assert!(data.get("seal").is_none());
        assert!(!is_sealed(&data));
    }
}
