// src/blockchain/eth_client.rs
//! EVM JSON-RPC client.
//!
//! Provides contract queries and signed contract transactions. Writes are only
//! reported successful once the transaction has a receipt with success status
//! and the configured number of confirmations.

use crate::error::RegistryError;
use ethers_contract::{BaseContract, Contract};
use ethers_core::{
    abi::{Detokenize, Tokenize},
    types::{Address, H256, U256, U64},
};
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
};
use log::debug;
use std::sync::Arc;

/// Gas limit attached to every contract write.
const WRITE_GAS_LIMIT: u64 = 3_000_000;

/// JSON-RPC client shared by every contract binding.
#[derive(Clone, Debug)]
pub struct EthClient {
    provider: Arc<Provider<Http>>,
    chain_id: u64,
    confirmations: usize,
}

impl EthClient {
    /// Connects to `rpc_url` and reads the chain id.
    ///
    /// # Errors
    /// Returns error if the URL is malformed or the node cannot be reached.
    pub async fn connect(rpc_url: &str, confirmations: usize) -> Result<Self, RegistryError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| RegistryError::Rpc(format!("invalid rpc url {}: {}", rpc_url, e)))?;
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| RegistryError::Rpc(e.to_string()))?
            .as_u64();
        debug!("connected to {} (chain id {})", rpc_url, chain_id);

        Ok(Self {
            provider: Arc::new(provider),
            chain_id,
            confirmations,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Queries a smart contract (read-only operation).
    ///
    /// # Arguments
    /// * `abi` - Contract interface
    /// * `address` - Address of the target contract
    /// * `method` - Method name to call
    /// * `params` - Method parameters
    pub async fn query_contract<R: Detokenize>(
        &self,
        abi: &BaseContract,
        address: Address,
        method: &str,
        params: impl Tokenize,
    ) -> Result<R, RegistryError> {
        let contract = Contract::new(address, abi.clone(), self.provider.clone());

        contract
            .method::<_, R>(method, params)
            .map_err(|e| RegistryError::Contract(e.to_string()))?
            .call()
            .await
            .map_err(|e| RegistryError::Rpc(e.to_string()))
    }

    /// Sends a contract transaction signed by `signer` and waits for its receipt.
    ///
    /// # Returns
    /// Hash of the confirmed transaction
    ///
    /// # Errors
    /// - `Rpc` if submission or receipt polling fails
    /// - `Dropped` if the transaction disappeared from the mempool
    /// - `Reverted` if the receipt reports failure
    pub async fn send_transaction(
        &self,
        abi: &BaseContract,
        address: Address,
        method: &str,
        params: impl Tokenize,
        signer: &LocalWallet,
    ) -> Result<H256, RegistryError> {
        let middleware = SignerMiddleware::new(
            self.provider.clone(),
            signer.clone().with_chain_id(self.chain_id),
        );
        let contract = Contract::new(address, abi.clone(), Arc::new(middleware));

        // return value of a sent transaction is never decoded
        let call = contract
            .method::<_, H256>(method, params)
            .map_err(|e| RegistryError::Contract(e.to_string()))?
            .gas(U256::from(WRITE_GAS_LIMIT));

        let pending = call
            .send()
            .await
            .map_err(|e| RegistryError::Rpc(e.to_string()))?;
        let tx_hash = pending.tx_hash();
        debug!("submitted {} as {:?}", method, tx_hash);

        let receipt = pending
            .confirmations(self.confirmations)
            .await
            .map_err(|e| RegistryError::Rpc(e.to_string()))?
            .ok_or(RegistryError::Dropped(tx_hash))?;

        if receipt.status != Some(U64::from(1)) {
            return Err(RegistryError::Reverted(tx_hash));
        }
        Ok(tx_hash)
    }
}
