// src/error.rs
//! Error types for identity management and authentication.
//!
//! Every failure the subsystem can produce is an expected, recoverable outcome
//! and is returned to the caller as a typed value. Nothing in here is meant to
//! be raised as a panic.

use ethers_core::types::H256;
use std::time::Duration;
use thiserror::Error;

/// Failures of the remote identity registry.
///
/// These are the only errors a caller may reasonably retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The JSON-RPC call itself failed (connection refused, bad response, ...)
    #[error("registry rpc call failed: {0}")]
    Rpc(String),

    #[error("registry call timed out after {0:?}")]
    Timeout(Duration),

    /// The write was mined but the contract reverted it
    #[error("registry transaction {0:?} reverted")]
    Reverted(H256),

    /// The write was submitted but never produced a receipt
    #[error("registry transaction {0:?} was dropped before confirmation")]
    Dropped(H256),

    /// The signer is not allowed to write the given identifier
    #[error("signer {signer} is not authorized to write {identifier}")]
    Unauthorized { identifier: String, signer: String },

    #[error("registry is unavailable")]
    Unavailable,

    /// Contract binding could not be constructed (bad ABI or address)
    #[error("invalid registry contract: {0}")]
    Contract(String),
}

/// Errors returned by the identity manager and the authentication service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid identifier format: {0}")]
    InvalidIdentifierFormat(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The identifier has never been written to the registry
    #[error("identifier not found: {0}")]
    NotFound(String),

    /// A document is already recorded for the identifier
    #[error("identifier already exists: {0}")]
    AlreadyExists(String),

    #[error("no active challenge for {0}")]
    ChallengeNotFound(String),

    #[error("challenge for {0} has expired")]
    ChallengeExpired(String),

    /// The address embedded in the identifier is not the claimed address
    #[error("identifier {identifier} does not belong to {address}")]
    IdentifierMismatch { identifier: String, address: String },

    /// The signature recovers to a different address than the claimed one
    #[error("signature was produced by {recovered}, expected {expected}")]
    SignatureMismatch { expected: String, recovered: String },

    #[error("malformed signature: {0}")]
    InvalidSignature(String),

    /// The registry records a different controller for the identifier
    #[error("{address} is not the registered owner of {identifier}")]
    OwnershipMismatch { identifier: String, address: String },

    #[error("invalid identity document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The stored document could not be decoded into a complete document
    #[error("malformed identity document: {0}")]
    Serialization(String),
}

impl IdentityError {
    /// Stable machine-readable tag for this error, used at the API boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityError::InvalidIdentifierFormat(_) => "invalid_identifier_format",
            IdentityError::InvalidAddress(_) => "invalid_address",
            IdentityError::NotFound(_) => "not_found",
            IdentityError::AlreadyExists(_) => "already_exists",
            IdentityError::ChallengeNotFound(_) => "challenge_not_found",
            IdentityError::ChallengeExpired(_) => "challenge_expired",
            IdentityError::IdentifierMismatch { .. } => "identifier_mismatch",
            IdentityError::SignatureMismatch { .. } => "signature_mismatch",
            IdentityError::InvalidSignature(_) => "invalid_signature",
            IdentityError::OwnershipMismatch { .. } => "ownership_mismatch",
            IdentityError::InvalidDocument(_) => "invalid_document",
            IdentityError::Registry(_) => "registry_error",
            IdentityError::Serialization(_) => "serialization_error",
        }
    }

    /// True for transient failures where repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IdentityError::Registry(_))
    }
}

impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        IdentityError::Serialization(err.to_string())
    }
}
