// src/config.rs
//! Runtime configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults
//! 2. `did-auth.toml` in the working directory (optional)
//! 3. `DID_AUTH__*` environment variables, e.g. `DID_AUTH__NETWORK=mainnet`
//!
//! `.env` files are loaded into the environment by the binary before this runs.
//! `PRIVATE_KEY` is honoured when `DID_AUTH__PRIVATE_KEY` is not set.

use crate::services::authenticator::DEFAULT_CHALLENGE_TTL_SECS;
use crate::services::sweeper::DEFAULT_SWEEP_INTERVAL;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    /// Deployed registry contract reached over JSON-RPC
    Contract,
    /// Process-local registry, for development
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub did_method: String,
    pub network: String,
    pub registry_backend: RegistryBackend,
    pub rpc_url: String,
    pub registry_address: Option<String>,
    pub private_key: Option<String>,
    pub profile_base_url: String,
    pub listen_addr: SocketAddr,
    pub registry_timeout_secs: u64,
    pub confirmations: usize,
    pub challenge_ttl_secs: i64,
    pub sweep_interval_secs: u64,
    pub protocol_label: String,
}

impl Settings {
    /// Loads settings from the file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings: Settings = Self::builder()?
            .add_source(File::with_name("did-auth").required(false))
            .add_source(Environment::with_prefix("DID_AUTH").separator("__"))
            .build()?
            .try_deserialize()?;

        if settings.private_key.is_none() {
            settings.private_key = std::env::var("PRIVATE_KEY").ok();
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects durations the services cannot run with.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.registry_timeout_secs == 0 {
            return Err(ConfigError::Message("registry_timeout_secs must be positive".into()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Message("sweep_interval_secs must be positive".into()));
        }
        if self.challenge_ttl_secs <= 0 {
            return Err(ConfigError::Message("challenge_ttl_secs must be positive".into()));
        }
        Ok(())
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("did_method", "ethr")?
            .set_default("network", "sepolia")?
            .set_default("registry_backend", "memory")?
            .set_default("rpc_url", "https://ethereum-sepolia-rpc.publicnode.com")?
            .set_default("profile_base_url", "https://identity.example/profile")?
            .set_default("listen_addr", "127.0.0.1:3000")?
            .set_default("registry_timeout_secs", 30)?
            .set_default("confirmations", 1)?
            .set_default("challenge_ttl_secs", DEFAULT_CHALLENGE_TTL_SECS)?
            .set_default("sweep_interval_secs", DEFAULT_SWEEP_INTERVAL.as_secs())?
            .set_default("protocol_label", "Decentralized Identity")
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }

    pub fn challenge_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.challenge_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
