// src/contracts/identity_registry.rs
//! Identity Registry interface and its smart contract implementation.
//!
//! The registry is the authoritative remote store of identity documents,
//! their write counters and their recorded owners. [`IdentityRegistry`] is the
//! boundary the rest of the crate programs against; [`ContractRegistry`]
//! implements it on top of a deployed registry contract.

use crate::blockchain::eth_client::EthClient;
use crate::error::RegistryError;
use async_trait::async_trait;
use ethers::signers::LocalWallet;
use ethers_contract::BaseContract;
use ethers_core::abi::parse_abi;
use ethers_core::types::{Address, H256, U256};
use std::str::FromStr;
use std::sync::Arc;

/// Human-readable ABI of the registry contract.
const IDENTITY_REGISTRY_ABI: &[&str] = &[
    "function exists(string identifier) external view returns (bool)",
    "function readDocument(string identifier) external view returns (string)",
    "function writeDocument(string identifier, string document) external",
    "function getOwner(string identifier) external view returns (address)",
    "function getVersion(string identifier) external view returns (uint256)",
];

/// Remote registry of identity documents.
///
/// All calls may fail or hang; callers are expected to bound them with a
/// timeout. Every call except `write_document` is idempotent.
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    async fn exists(&self, identifier: &str) -> Result<bool, RegistryError>;

    /// Serialized document stored under `identifier`, if any.
    async fn read_document(&self, identifier: &str) -> Result<Option<String>, RegistryError>;

    /// Replaces the document stored under `identifier`.
    ///
    /// `authorization` signs the write; the registry records it as owner on the
    /// first write and rejects writes from anyone else afterwards. Returns once
    /// the write is durable.
    async fn write_document(
        &self,
        identifier: &str,
        document: &str,
        authorization: &LocalWallet,
    ) -> Result<H256, RegistryError>;

    /// Controller address recorded for `identifier`.
    async fn get_owner(&self, identifier: &str) -> Result<Address, RegistryError>;

    /// Number of successful writes to `identifier`.
    async fn get_version(&self, identifier: &str) -> Result<u64, RegistryError>;
}

/// Registry backed by a deployed `IdentityRegistry` contract.
pub struct ContractRegistry {
    client: Arc<EthClient>,
    address: Address,
    abi: BaseContract,
}

impl ContractRegistry {
    /// Binds to the registry contract at `contract_address`.
    ///
    /// # Errors
    /// `Contract` if the address is not a valid hex address.
    pub fn new(client: Arc<EthClient>, contract_address: &str) -> Result<Self, RegistryError> {
        let address = Address::from_str(contract_address)
            .map_err(|e| RegistryError::Contract(format!("{}: {}", contract_address, e)))?;
        let abi = parse_abi(IDENTITY_REGISTRY_ABI)
            .map_err(|e| RegistryError::Contract(e.to_string()))?;

        Ok(ContractRegistry {
            client,
            address,
            abi: BaseContract::from(abi),
        })
    }
}

#[async_trait]
impl IdentityRegistry for ContractRegistry {
    async fn exists(&self, identifier: &str) -> Result<bool, RegistryError> {
        self.client
            .query_contract(&self.abi, self.address, "exists", identifier.to_string())
            .await
    }

    async fn read_document(&self, identifier: &str) -> Result<Option<String>, RegistryError> {
        let document: String = self
            .client
            .query_contract(&self.abi, self.address, "readDocument", identifier.to_string())
            .await?;
        // The contract returns an empty string for unknown identifiers
        Ok(Some(document).filter(|d| !d.is_empty()))
    }

    async fn write_document(
        &self,
        identifier: &str,
        document: &str,
        authorization: &LocalWallet,
    ) -> Result<H256, RegistryError> {
        self.client
            .send_transaction(
                &self.abi,
                self.address,
                "writeDocument",
                (identifier.to_string(), document.to_string()),
                authorization,
            )
            .await
    }

    async fn get_owner(&self, identifier: &str) -> Result<Address, RegistryError> {
        self.client
            .query_contract(&self.abi, self.address, "getOwner", identifier.to_string())
            .await
    }

    async fn get_version(&self, identifier: &str) -> Result<u64, RegistryError> {
        let version: U256 = self
            .client
            .query_contract(&self.abi, self.address, "getVersion", identifier.to_string())
            .await?;
        // A counter beyond u64 means the contract is not the one we expect
        if version > U256::from(u64::MAX) {
            return Err(RegistryError::Contract(format!("version {} out of range", version)));
        }
        Ok(version.as_u64())
    }
}
