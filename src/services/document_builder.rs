// src/services/document_builder.rs
//! Construction and merging of identity documents. No I/O.

use crate::models::did::Did;
use crate::models::document::{
    DocumentPatch, IdentityDocument, ServiceEndpoint, ServiceEntry, VerificationMethod,
};
use crate::utils::clock::Clock;
use crate::utils::crypto::format_address;
use ethers_core::types::Address;
use std::sync::Arc;

pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";
pub const SECP256K1_RECOVERY_CONTEXT: &str =
    "https://w3id.org/security/suites/secp256k1recovery-2020/v2";

/// Key type for keys identified by the address that recovers from their signatures.
pub const VERIFICATION_METHOD_TYPE: &str = "EcdsaSecp256k1RecoveryMethod2020";

pub const PROFILE_SERVICE_NAME: &str = "profile";
pub const PROFILE_SERVICE_TYPE: &str = "ProfileService";

#[derive(Clone)]
pub struct DocumentBuilder {
    profile_base_url: String,
    clock: Arc<dyn Clock>,
}

impl DocumentBuilder {
    /// # Arguments
    /// * `profile_base_url` - Base URL profile endpoints are derived from
    /// * `clock` - Time source for `created`/`updated`
    pub fn new(profile_base_url: &str, clock: Arc<dyn Clock>) -> Self {
        DocumentBuilder {
            profile_base_url: profile_base_url.trim_end_matches('/').to_string(),
            clock,
        }
    }

    /// Profile URL for `address`. Always lower-cases the address.
    pub fn profile_endpoint(&self, address: Address) -> String {
        format!("{}/{}", self.profile_base_url, format_address(address))
    }

    /// Builds the initial document for `did`, controlled by `address`.
    ///
    /// The document has exactly one verification method (`#key-1`), referenced
    /// from both `authentication` and `assertionMethod`, and one profile
    /// service entry.
    pub fn build(&self, did: &Did, address: Address) -> IdentityDocument {
        let id = did.to_string();
        let key_id = did.key_id(1);
        let now = self.clock.now();

        IdentityDocument {
            context: vec![
                DID_CONTEXT.to_string(),
                SECP256K1_RECOVERY_CONTEXT.to_string(),
            ],
            verification_method: vec![VerificationMethod {
                id: key_id.clone(),
                kind: VERIFICATION_METHOD_TYPE.to_string(),
                controller: id.clone(),
                blockchain_account_id: Some(format_address(address)),
                public_key_hex: None,
            }],
            authentication: vec![key_id.clone()],
            assertion_method: vec![key_id],
            service: vec![ServiceEntry {
                id: did.service_id(PROFILE_SERVICE_NAME),
                kind: PROFILE_SERVICE_TYPE.to_string(),
                service_endpoint: ServiceEndpoint::Single(self.profile_endpoint(address)),
                description: Some("Identity profile".to_string()),
            }],
            id,
            created: now,
            updated: now,
        }
    }

    /// Shallow merge: each field present in `patch` replaces the whole field
    /// of `existing`. Lists are replaced, never appended to. `created` is kept
    /// and `updated` is set to now.
    pub fn merge(&self, existing: &IdentityDocument, patch: DocumentPatch) -> IdentityDocument {
        let mut merged = existing.clone();
        if let Some(context) = patch.context {
            merged.context = context;
        }
        if let Some(verification_method) = patch.verification_method {
            merged.verification_method = verification_method;
        }
        if let Some(authentication) = patch.authentication {
            merged.authentication = authentication;
        }
        if let Some(assertion_method) = patch.assertion_method {
            merged.assertion_method = assertion_method;
        }
        if let Some(service) = patch.service {
            merged.service = service;
        }
        merged.updated = self.clock.now();
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use crate::utils::crypto::parse_address;
    use chrono::{Duration, Utc};

    const ADDR: &str = "0xAbC0000000000000000000000000000000000123";

    fn builder() -> (DocumentBuilder, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (DocumentBuilder::new("https://id.example/profile/", clock.clone()), clock)
    }

    fn service(name: &str) -> ServiceEntry {
        ServiceEntry {
            id: format!("id:ethr:sepolia:0xabc0000000000000000000000000000000000123#{name}"),
            kind: "LinkedDomains".into(),
            service_endpoint: ServiceEndpoint::Single(format!("https://{name}.example")),
            description: None,
        }
    }

    #[test]
    fn test_build_shape() {
        let (builder, clock) = builder();
        let address = parse_address(ADDR).unwrap();
        let did = Did::new("ethr", "sepolia", address);
        let doc = builder.build(&did, address);

        assert_eq!(doc.id, did.to_string());
        assert_eq!(doc.verification_method.len(), 1);
        let vm = &doc.verification_method[0];
        assert_eq!(vm.id, format!("{}#key-1", did));
        assert_eq!(vm.controller, doc.id);
        assert_eq!(vm.key_material(), Some("0xabc0000000000000000000000000000000000123"));
        assert_eq!(doc.authentication, vec![vm.id.clone()]);
        assert_eq!(doc.assertion_method, vec![vm.id.clone()]);

        assert_eq!(doc.service.len(), 1);
        assert_eq!(doc.service[0].id, format!("{}#profile", did));
        assert_eq!(doc.service[0].kind, PROFILE_SERVICE_TYPE);
        assert_eq!(
            doc.service[0].service_endpoint,
            ServiceEndpoint::Single(
                "https://id.example/profile/0xabc0000000000000000000000000000000000123".into()
            )
        );
        assert_eq!(doc.created, clock.now());
        assert_eq!(doc.updated, clock.now());
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_build_is_deterministic() {
        let (builder, _) = builder();
        let address = parse_address(ADDR).unwrap();
        let did = Did::new("ethr", "sepolia", address);
        assert_eq!(builder.build(&did, address), builder.build(&did, address));
    }

    #[test]
    fn test_merge_replaces_lists_wholesale() {
        let (builder, clock) = builder();
        let address = parse_address(ADDR).unwrap();
        let mut existing = builder.build(&Did::new("ethr", "sepolia", address), address);
        existing.service = vec![service("s1")];

        clock.advance(Duration::seconds(30));
        let merged = builder.merge(
            &existing,
            DocumentPatch {
                service: Some(vec![service("s2")]),
                ..Default::default()
            },
        );

        assert_eq!(merged.service, vec![service("s2")]);
        assert_eq!(merged.verification_method, existing.verification_method);
        assert_eq!(merged.context, existing.context);
        assert_eq!(merged.created, existing.created);
        assert_eq!(merged.updated, clock.now());
    }

    #[test]
    fn test_empty_patch_only_touches_updated() {
        let (builder, clock) = builder();
        let address = parse_address(ADDR).unwrap();
        let existing = builder.build(&Did::new("ethr", "sepolia", address), address);

        clock.advance(Duration::seconds(1));
        let merged = builder.merge(&existing, DocumentPatch::default());
        assert_eq!(
            IdentityDocument { updated: existing.updated, ..merged.clone() },
            existing
        );
        assert!(merged.updated > existing.updated);
    }

    #[test]
    fn test_merge_can_empty_a_list() {
        let (builder, _) = builder();
        let address = parse_address(ADDR).unwrap();
        let existing = builder.build(&Did::new("ethr", "sepolia", address), address);
        let merged = builder.merge(
            &existing,
            DocumentPatch {
                service: Some(vec![]),
                ..Default::default()
            },
        );
        assert!(merged.service.is_empty());
    }
}
