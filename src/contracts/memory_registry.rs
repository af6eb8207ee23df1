// src/contracts/memory_registry.rs
//! Process-local identity registry.
//!
//! Mirrors the registry contract's rules (owner recorded on first write,
//! writes from anyone else rejected, version bumped per write) without a
//! chain. Used for local development and as the registry in tests.

use crate::contracts::identity_registry::IdentityRegistry;
use crate::error::RegistryError;
use crate::utils::crypto::{format_address, hash_data};
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers_core::types::{Address, H256};
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry {
    document: String,
    owner: Address,
    version: u64,
}

#[derive(Debug)]
pub struct InMemoryRegistry {
    entries: Mutex<HashMap<String, Entry>>,
    online: AtomicBool,
    calls: AtomicUsize,
    /// Artificial delay applied to every call
    latency: Option<Duration>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        InMemoryRegistry {
            entries: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// Delays every call by `latency`, to exercise caller timeouts.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// While offline every call fails with `RegistryError::Unavailable`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of registry calls made so far, successful or not.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Stores `document` verbatim, bypassing authorization. The raw string is
    /// not validated, so malformed documents can be planted.
    pub fn insert_raw(&self, identifier: &str, document: &str, owner: Address) {
        let mut entries = self.lock();
        let version = entries.get(identifier).map_or(1, |e| e.version + 1);
        entries.insert(
            identifier.to_string(),
            Entry {
                document: document.to_string(),
                owner,
                version,
            },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn enter(&self) -> Result<(), RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RegistryError::Unavailable)
        }
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityRegistry for InMemoryRegistry {
    async fn exists(&self, identifier: &str) -> Result<bool, RegistryError> {
        self.enter().await?;
        Ok(self.lock().contains_key(identifier))
    }

    async fn read_document(&self, identifier: &str) -> Result<Option<String>, RegistryError> {
        self.enter().await?;
        Ok(self.lock().get(identifier).map(|e| e.document.clone()))
    }

    async fn write_document(
        &self,
        identifier: &str,
        document: &str,
        authorization: &LocalWallet,
    ) -> Result<H256, RegistryError> {
        self.enter().await?;
        let signer = authorization.address();
        let mut entries = self.lock();

        let version = match entries.get(identifier) {
            Some(entry) if entry.owner != signer => {
                return Err(RegistryError::Unauthorized {
                    identifier: identifier.to_string(),
                    signer: format_address(signer),
                });
            }
            Some(entry) => entry.version + 1,
            None => 1,
        };
        entries.insert(
            identifier.to_string(),
            Entry {
                document: document.to_string(),
                owner: signer,
                version,
            },
        );
        debug!("stored {} at version {}", identifier, version);

        // Stand-in for a transaction hash: binds identifier, version and content
        let receipt = format!("{}:{}:{}", identifier, version, document);
        Ok(H256::from(hash_data(receipt.as_bytes())))
    }

    async fn get_owner(&self, identifier: &str) -> Result<Address, RegistryError> {
        self.enter().await?;
        // Unknown identifiers have the zero address as owner, as on chain
        Ok(self.lock().get(identifier).map_or(Address::zero(), |e| e.owner))
    }

    async fn get_version(&self, identifier: &str) -> Result<u64, RegistryError> {
        self.enter().await?;
        Ok(self.lock().get(identifier).map_or(0, |e| e.version))
    }
}
