// src/models/document.rs
//! Identity document data model.
//!
//! Follows the general shape of a W3C DID Document: a list of verification
//! methods, references to them for authentication and assertion, and a list of
//! service endpoints. Documents are stored in the registry as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An identity document as stored in the registry.
///
/// # Invariant
/// `verification_method` contains at least one entry whose `controller` is
/// equal to `id`. Use [`IdentityDocument::validate`] before trusting a document
/// that came from outside the process.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDocument {
    /// Schema context URIs, kept in their original order
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// Identifier this document describes
    pub id: String,

    pub verification_method: Vec<VerificationMethod>,

    /// Verification method ids usable for authentication
    pub authentication: Vec<String>,

    /// Verification method ids usable for assertions
    pub assertion_method: Vec<String>,

    #[serde(default)]
    pub service: Vec<ServiceEntry>,

    /// Set on first write and never changed afterwards
    pub created: DateTime<Utc>,

    /// Refreshed on every successful write
    pub updated: DateTime<Utc>,
}

/// A key descriptor within a document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub controller: String,

    /// Blockchain address controlling this key (recovery-style methods)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_account_id: Option<String>,

    /// Hex-encoded public key, for methods that publish the key itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_hex: Option<String>,
}

impl VerificationMethod {
    /// Key material of this method: the account address or the public key.
    pub fn key_material(&self) -> Option<&str> {
        self.blockchain_account_id
            .as_deref()
            .or(self.public_key_hex.as_deref())
    }
}

/// A service endpoint advertised by the identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub service_endpoint: ServiceEndpoint,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One endpoint URL or a list of them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ServiceEndpoint {
    Single(String),
    Multiple(Vec<String>),
}

/// Partial update of a document.
///
/// Every field that is `Some` replaces the whole corresponding field of the
/// existing document. `id` and `created` cannot be patched; `updated` is always
/// set by the writer.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DocumentPatch {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<Vec<VerificationMethod>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_method: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Vec<ServiceEntry>>,
}

impl IdentityDocument {
    /// Checks the structural invariants of the document.
    ///
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("document id is empty".to_string());
        }
        if let Some(vm) = self.verification_method.iter().find(|vm| vm.key_material().is_none()) {
            return Err(format!("verification method {} has no key material", vm.id));
        }
        if !self
            .verification_method
            .iter()
            .any(|vm| vm.controller == self.id)
        {
            return Err(format!(
                "no verification method is controlled by {}",
                self.id
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "@context": ["https://www.w3.org/ns/did/v1"],
            "id": "id:ethr:sepolia:0xabc0000000000000000000000000000000000123",
            "verificationMethod": [{
                "id": "id:ethr:sepolia:0xabc0000000000000000000000000000000000123#key-1",
                "type": "EcdsaSecp256k1RecoveryMethod2020",
                "controller": "id:ethr:sepolia:0xabc0000000000000000000000000000000000123",
                "blockchainAccountId": "0xabc0000000000000000000000000000000000123"
            }],
            "authentication": ["id:ethr:sepolia:0xabc0000000000000000000000000000000000123#key-1"],
            "assertionMethod": ["id:ethr:sepolia:0xabc0000000000000000000000000000000000123#key-1"],
            "service": [{
                "id": "id:ethr:sepolia:0xabc0000000000000000000000000000000000123#profile",
                "type": "ProfileService",
                "serviceEndpoint": ["https://a.example", "https://b.example"]
            }],
            "created": "2024-01-01T00:00:00Z",
            "updated": "2024-01-02T00:00:00Z"
        })
    }

    #[test]
    fn test_deserialize_wire_format() {
        let doc: IdentityDocument = serde_json::from_value(sample()).unwrap();
        assert_eq!(doc.verification_method.len(), 1);
        assert_eq!(
            doc.service[0].service_endpoint,
            ServiceEndpoint::Multiple(vec!["https://a.example".into(), "https://b.example".into()])
        );
        assert!(doc.validate().is_ok());

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_validate_requires_self_controlled_method() {
        let mut doc: IdentityDocument = serde_json::from_value(sample()).unwrap();
        doc.verification_method[0].controller = "id:ethr:sepolia:0xother".into();
        assert!(doc.validate().is_err());

        doc.verification_method.clear();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_validate_requires_key_material() {
        let mut doc: IdentityDocument = serde_json::from_value(sample()).unwrap();
        doc.verification_method[0].blockchain_account_id = None;
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_patch_rejects_immutable_fields() {
        let patch = serde_json::from_value::<DocumentPatch>(json!({ "id": "id:x:y:z" }));
        assert!(patch.is_err());
        let patch = serde_json::from_value::<DocumentPatch>(json!({ "created": "2024-01-01T00:00:00Z" }));
        assert!(patch.is_err());
    }
}
