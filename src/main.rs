// src/main.rs

//! # Decentralized Identity Authentication - Main Entry Point
//!
//! Loads configuration, connects to the identity registry, starts the
//! challenge sweeper and serves the HTTP API until Ctrl-C.
//!
//! ## Environment Variables
//! - `DID_AUTH__REGISTRY_BACKEND`: `contract` or `memory` (default `memory`)
//! - `DID_AUTH__RPC_URL`: JSON-RPC endpoint, for the contract backend
//! - `DID_AUTH__REGISTRY_ADDRESS`: deployed registry contract address
//! - `PRIVATE_KEY` / `DID_AUTH__PRIVATE_KEY`: server signing key (random if unset)
//! - `RUST_LOG`: log filter (default `info`)

use anyhow::{anyhow, Context};
use did_auth::blockchain::eth_client::EthClient;
use did_auth::config::{RegistryBackend, Settings};
use did_auth::contracts::identity_registry::{ContractRegistry, IdentityRegistry};
use did_auth::contracts::memory_registry::InMemoryRegistry;
use did_auth::services::api_server::ApiServer;
use did_auth::services::challenge_store::InMemoryChallengeStore;
use did_auth::services::document_builder::DocumentBuilder;
use did_auth::services::registry_client::RegistryClient;
use did_auth::services::sweeper::SweeperHandle;
use did_auth::utils::clock::{Clock, SystemClock};
use did_auth::utils::crypto::format_address;
use did_auth::wallet::key_management::KeyManager;
use did_auth::{AuthService, IdentityManager};
use dotenv::dotenv;
use log::{info, warn};
use std::sync::Arc;

async fn connect_registry(settings: &Settings) -> anyhow::Result<Arc<dyn IdentityRegistry>> {
    match settings.registry_backend {
        RegistryBackend::Memory => {
            warn!("using the in-memory registry; identities will not survive a restart");
            Ok(Arc::new(InMemoryRegistry::new()))
        }
        RegistryBackend::Contract => {
            let address = settings
                .registry_address
                .as_deref()
                .ok_or_else(|| anyhow!("DID_AUTH__REGISTRY_ADDRESS must be set for the contract backend"))?;
            let client = EthClient::connect(&settings.rpc_url, settings.confirmations)
                .await
                .with_context(|| format!("failed to connect to {}", settings.rpc_url))?;
            info!("registry contract {} on chain {}", address, client.chain_id());
            Ok(Arc::new(ContractRegistry::new(Arc::new(client), address)?))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("invalid configuration")?;

    let key_manager = match settings.private_key.as_deref() {
        Some(key) => KeyManager::from_private_key(key).context("invalid private key")?,
        None => {
            warn!("no private key configured; generated an ephemeral signing key");
            KeyManager::new()
        }
    };
    info!("server signing address {}", format_address(key_manager.address()));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = RegistryClient::new(
        connect_registry(&settings).await?,
        &settings.did_method,
        &settings.network,
        settings.registry_timeout(),
    );
    let builder = DocumentBuilder::new(&settings.profile_base_url, clock.clone());
    let identities = Arc::new(IdentityManager::new(registry, builder, clock.clone()));
    let auth = Arc::new(AuthService::new(
        identities.clone(),
        Arc::new(InMemoryChallengeStore::new()),
        clock,
        settings.challenge_ttl(),
        &settings.protocol_label,
    ));

    let sweeper = SweeperHandle::start(auth.clone(), settings.sweep_interval());

    let api_server = ApiServer::new(identities, auth, key_manager);
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
    };
    api_server.run(settings.listen_addr, shutdown).await?;

    sweeper.stop().await;
    Ok(())
}
