// src/lib.rs

//! # Decentralized Identity Authentication
//!
//! Lets a blockchain address register and maintain an identity document in a
//! remote registry, and lets any party authenticate the holder of that address
//! through a signed challenge.
//!
//! ## Architecture Overview
//! 1. **Contracts Layer**: `IdentityRegistry` boundary, on-chain and in-memory
//! 2. **Blockchain Layer**: `EthClient` for JSON-RPC queries and transactions
//! 3. **Services Layer**: registry client, document builder, identity manager,
//!    challenge store, authentication, sweeper, HTTP API
//! 4. **Cryptography Layer**: key management and EIP-191 signature recovery

pub mod blockchain;  // JSON-RPC chain access
pub mod config;      // Runtime settings
pub mod contracts;   // Registry boundary and implementations
pub mod error;       // Error types
pub mod models;      // Data structures
pub mod services;    // Business logic and API
pub mod utils;       // Helper functions
pub mod wallet;      // Signing keys

pub use error::{IdentityError, RegistryError};
pub use services::authenticator::AuthService;
pub use services::identity_manager::IdentityManager;
