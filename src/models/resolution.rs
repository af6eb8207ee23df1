// src/models/resolution.rs
//! Result of resolving an identifier against the registry.

use crate::models::document::IdentityDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a resolution produced no document.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionErrorKind {
    /// The identifier is not syntactically valid; the registry was not queried
    InvalidDid,
    /// The identifier has no document in the registry
    NotFound,
    /// The registry failed or returned a malformed document
    InternalError,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    /// Registry write counter for the identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub document: Option<IdentityDocument>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_error: Option<ResolutionErrorKind>,

    pub document_meta: DocumentMetadata,
}

impl ResolutionResult {
    pub fn found(document: IdentityDocument, version_id: u64) -> Self {
        let document_meta = DocumentMetadata {
            created: Some(document.created),
            updated: Some(document.updated),
            version_id: Some(version_id),
        };
        ResolutionResult {
            document: Some(document),
            resolution_error: None,
            document_meta,
        }
    }

    pub fn failed(kind: ResolutionErrorKind) -> Self {
        ResolutionResult {
            document: None,
            resolution_error: Some(kind),
            document_meta: DocumentMetadata::default(),
        }
    }
}
