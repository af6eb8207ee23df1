// src/services/registry_client.rs
//! Identity Registry client.
//!
//! Marshals identity documents to and from the remote registry and owns the
//! identifier syntax rules for the configured method and network. Every remote
//! call is bounded by a timeout.

use crate::contracts::identity_registry::IdentityRegistry;
use crate::error::{IdentityError, RegistryError};
use crate::models::did::Did;
use crate::models::document::IdentityDocument;
use crate::models::resolution::{ResolutionErrorKind, ResolutionResult};
use crate::utils::serialization::decode_document;
use ethers::signers::LocalWallet;
use ethers_core::types::{Address, H256};
use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct RegistryClient {
    registry: Arc<dyn IdentityRegistry>,
    method: String,
    network: String,
    timeout: Duration,
}

impl RegistryClient {
    /// # Arguments
    /// * `registry` - Remote registry implementation
    /// * `method` - DID method token identifiers are issued under (e.g. `ethr`)
    /// * `network` - Network token identifiers are issued under (e.g. `sepolia`)
    /// * `timeout` - Upper bound for every remote call
    pub fn new(
        registry: Arc<dyn IdentityRegistry>,
        method: &str,
        network: &str,
        timeout: Duration,
    ) -> Self {
        RegistryClient {
            registry,
            method: method.to_string(),
            network: network.to_string(),
            timeout,
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// Identifier for `address` under the configured method and network.
    pub fn identifier_for(&self, address: Address) -> Did {
        Did::new(&self.method, &self.network, address)
    }

    /// True iff `identifier` is syntactically valid. No I/O.
    pub fn validate_format(&self, identifier: &str) -> bool {
        Did::is_valid(identifier)
    }

    /// Address segment of `identifier`, if it is valid and uses the configured method.
    pub fn extract_address(&self, identifier: &str) -> Option<String> {
        let did: Did = identifier.parse().ok()?;
        if did.method() != self.method {
            return None;
        }
        Some(did.address().to_string())
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, RegistryError>>,
    ) -> Result<T, RegistryError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| RegistryError::Timeout(self.timeout))?
    }

    /// Reads and decodes the document for `identifier` along with its version.
    ///
    /// Returns `Ok(None)` when the registry has no document for it.
    pub async fn fetch(
        &self,
        identifier: &str,
    ) -> Result<Option<(IdentityDocument, u64)>, IdentityError> {
        if !self.call(self.registry.exists(identifier)).await? {
            return Ok(None);
        }
        let raw = match self.call(self.registry.read_document(identifier)).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let document = decode_document(&raw, identifier)?;
        let version = self.call(self.registry.get_version(identifier)).await?;
        Ok(Some((document, version)))
    }

    /// Resolves `identifier` into a resolution result. Never fails: every
    /// failure is reported through `resolution_error`.
    pub async fn read(&self, identifier: &str) -> ResolutionResult {
        match self.fetch(identifier).await {
            Ok(Some((document, version))) => {
                debug!("resolved {} at version {}", identifier, version);
                ResolutionResult::found(document, version)
            }
            Ok(None) => ResolutionResult::failed(ResolutionErrorKind::NotFound),
            Err(err) => {
                warn!("failed to resolve {}: {}", identifier, err);
                ResolutionResult::failed(ResolutionErrorKind::InternalError)
            }
        }
    }

    /// Writes a serialized document and waits for the registry to acknowledge it.
    pub async fn write(
        &self,
        identifier: &str,
        document: &str,
        authorization: &LocalWallet,
    ) -> Result<H256, IdentityError> {
        let tx_hash = self
            .call(self.registry.write_document(identifier, document, authorization))
            .await
            .map_err(|err| {
                warn!("write of {} failed: {}", identifier, err);
                err
            })?;
        Ok(tx_hash)
    }

    /// Controller address the registry records for `identifier`.
    pub async fn get_owner(&self, identifier: &str) -> Result<Address, IdentityError> {
        Ok(self.call(self.registry.get_owner(identifier)).await?)
    }
}
