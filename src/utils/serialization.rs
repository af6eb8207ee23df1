// src/utils/serialization.rs
//! Serialization utilities for identity documents.
//!
//! Documents cross the registry boundary as JSON strings. Decoding either
//! yields a fully validated [`IdentityDocument`] or a `Serialization` error;
//! a partially valid document is never handed to the rest of the system.

use crate::error::IdentityError;
use crate::models::document::IdentityDocument;
use serde::{Deserialize, Serialize};

/// Serializes a value to a JSON string.
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Deserializes a value from a JSON string.
pub fn deserialize<'a, T: Deserialize<'a>>(data: &'a str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}

/// Encodes a document for storage in the registry.
pub fn encode_document(document: &IdentityDocument) -> Result<String, IdentityError> {
    serialize(document).map_err(IdentityError::from)
}

/// Decodes and validates a document read from the registry under `identifier`.
///
/// # Errors
/// `Serialization` if the JSON is malformed, lacks required fields, is stored
/// under a different identifier, or violates the controller invariant.
pub fn decode_document(raw: &str, identifier: &str) -> Result<IdentityDocument, IdentityError> {
    let document: IdentityDocument = deserialize(raw)?;
    if document.id != identifier {
        return Err(IdentityError::Serialization(format!(
            "document id {} does not match registry key {}",
            document.id, identifier
        )));
    }
    document.validate().map_err(IdentityError::Serialization)?;
    Ok(document)
}
