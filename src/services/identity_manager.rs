// src/services/identity_manager.rs
//! Identity Manager
//!
//! Creates, resolves and updates identity documents and answers ownership
//! questions. This is the primary public contract of the crate; it composes
//! the [`RegistryClient`] and the [`DocumentBuilder`].
//!
//! Ownership is always answered by the registry's recorded controller, never
//! by the content of the document.

use crate::error::IdentityError;
use crate::models::did::Did;
use crate::models::document::{DocumentPatch, IdentityDocument};
use crate::models::resolution::{ResolutionErrorKind, ResolutionResult};
use crate::models::user::IdentityUser;
use crate::services::document_builder::DocumentBuilder;
use crate::services::registry_client::RegistryClient;
use crate::utils::clock::Clock;
use crate::utils::crypto::{addresses_match, format_address};
use crate::utils::serialization::encode_document;
use crate::wallet::key_management::KeyManager;
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Service for managing identities in the registry.
pub struct IdentityManager {
    registry: RegistryClient,
    builder: DocumentBuilder,
    clock: Arc<dyn Clock>,
    /// Identities loaded into this process, keyed by identifier
    users: RwLock<HashMap<String, IdentityUser>>,
}

impl IdentityManager {
    pub fn new(registry: RegistryClient, builder: DocumentBuilder, clock: Arc<dyn Clock>) -> Self {
        IdentityManager {
            registry,
            builder,
            clock,
            users: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    /// Locally loaded record for `identifier`, if any.
    pub fn user(&self, identifier: &str) -> Option<IdentityUser> {
        self.users
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(identifier)
            .cloned()
    }

    fn remember(&self, user: IdentityUser) {
        self.users
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user.identifier.clone(), user);
    }

    /// Creates the identity of the signer's address.
    ///
    /// Builds the initial document and writes it to the registry, authorized
    /// by `signer`. An identity that already has a document is never
    /// rewritten; use [`update`](Self::update) to change it. Does not retry.
    ///
    /// # Errors
    /// - `AlreadyExists` if the registry already holds a document for the address
    /// - `Registry` if the write is rejected, times out or reverts
    pub async fn create(&self, signer: &KeyManager) -> Result<IdentityUser, IdentityError> {
        let address = signer.address();
        let did = self.registry.identifier_for(address);
        let identifier = did.to_string();

        if self.registry.fetch(&identifier).await?.is_some() {
            return Err(IdentityError::AlreadyExists(identifier));
        }

        let document = self.builder.build(&did, address);
        let serialized = encode_document(&document)?;
        let tx_hash = self
            .registry
            .write(&identifier, &serialized, signer.wallet())
            .await?;
        info!("created {} in {:?}", identifier, tx_hash);

        let user = IdentityUser {
            identifier,
            address: format_address(address),
            document,
            created_at: self.clock.now(),
            is_verified: true,
        };
        self.remember(user.clone());
        Ok(user)
    }

    /// Resolves `identifier` to its current document. This is the only read path.
    ///
    /// Syntactically invalid identifiers are reported as `InvalidDid` without
    /// querying the registry.
    pub async fn resolve(&self, identifier: &str) -> ResolutionResult {
        if !self.registry.validate_format(identifier) {
            return ResolutionResult::failed(ResolutionErrorKind::InvalidDid);
        }
        self.registry.read(identifier).await
    }

    /// Typed variant of [`resolve`](Self::resolve) for internal callers.
    ///
    /// # Errors
    /// - `InvalidIdentifierFormat` if `identifier` is malformed
    /// - `NotFound` if the registry has no document for it
    /// - `Registry` / `Serialization` if the read fails
    pub async fn resolve_document(&self, identifier: &str) -> Result<IdentityDocument, IdentityError> {
        parse_identifier(identifier)?;
        self.registry
            .fetch(identifier)
            .await?
            .map(|(document, _)| document)
            .ok_or_else(|| IdentityError::NotFound(identifier.to_string()))
    }

    /// Loads an existing identity into the local user records.
    ///
    /// `is_verified` reflects whether the registry owner is the address
    /// embedded in the identifier.
    pub async fn load_user(&self, identifier: &str) -> Result<IdentityUser, IdentityError> {
        let did = parse_identifier(identifier)?;
        let document = self.resolve_document(identifier).await?;
        let is_verified = self.is_owner(identifier, did.address()).await?;

        let user = IdentityUser {
            identifier: identifier.to_string(),
            address: did.address().to_string(),
            created_at: document.created,
            document,
            is_verified,
        };
        self.remember(user.clone());
        Ok(user)
    }

    /// Applies `patch` to the current document of `identifier`.
    ///
    /// The patch is merged shallowly (see [`DocumentBuilder::merge`]) and the
    /// result written with `signer` as authorization. On success the locally
    /// loaded record, if any, is refreshed with the merged document.
    ///
    /// # Errors
    /// - `InvalidIdentifierFormat` if `identifier` is malformed
    /// - `NotFound` if the registry has no document for it
    /// - `OwnershipMismatch` if `signer` is not the registry owner
    /// - `InvalidDocument` if the merge leaves no self-controlled key
    /// - `Registry` / `Serialization` on registry failures
    pub async fn update(
        &self,
        identifier: &str,
        patch: DocumentPatch,
        signer: &KeyManager,
    ) -> Result<IdentityDocument, IdentityError> {
        let existing = self.resolve_document(identifier).await?;

        let signer_address = format_address(signer.address());
        if !self.is_owner(identifier, &signer_address).await? {
            return Err(IdentityError::OwnershipMismatch {
                identifier: identifier.to_string(),
                address: signer_address,
            });
        }

        let merged = self.builder.merge(&existing, patch);
        merged.validate().map_err(IdentityError::InvalidDocument)?;
        let serialized = encode_document(&merged)?;
        let tx_hash = self
            .registry
            .write(identifier, &serialized, signer.wallet())
            .await?;
        info!("updated {} in {:?}", identifier, tx_hash);

        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        if let Some(user) = users.get_mut(identifier) {
            user.document = merged.clone();
        }
        Ok(merged)
    }

    /// True iff the registry records `address` (any letter case) as the owner
    /// of `identifier`. Document content is not consulted.
    pub async fn is_owner(&self, identifier: &str, address: &str) -> Result<bool, IdentityError> {
        let owner = self.registry.get_owner(identifier).await?;
        if owner.is_zero() {
            return Ok(false);
        }
        Ok(addresses_match(&format_address(owner), address))
    }
}

fn parse_identifier(identifier: &str) -> Result<Did, IdentityError> {
    identifier
        .parse()
        .map_err(|e| IdentityError::InvalidIdentifierFormat(format!("{}: {}", identifier, e)))
}
