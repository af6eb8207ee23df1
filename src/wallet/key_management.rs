// src/wallet/key_management.rs
//! Cryptographic key management for the identity wallet.
//!
//! The [`KeyManager`] is the signing capability used throughout the crate:
//! - its address is the address an identity is created for
//! - it authorizes registry writes for that identity
//! - it signs authentication challenges as EIP-191 personal messages
//!
//! Uses the secp256k1 curve (via `k256`) wrapped in an ethers `LocalWallet`.

use ethers::signers::{LocalWallet, Signer, WalletError};
use ethers::types::{Address, Signature};
use ethers_core::utils::hex;
use k256::ecdsa::SigningKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("private key is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("private key is not a valid secp256k1 scalar")]
    InvalidKey,
}

/// Secp256k1 signing key for one blockchain address.
///
/// # Security Notes
/// - The secret key is never exposed or logged
/// - Messages are signed with the EIP-191 prefix, the same convention
///   browser wallets use for `personal_sign`
#[derive(Clone, Debug)]
pub struct KeyManager {
    wallet: LocalWallet,
}

impl KeyManager {
    /// Generates a KeyManager with a fresh random key.
    pub fn new() -> Self {
        KeyManager {
            wallet: LocalWallet::new(&mut rand::thread_rng()),
        }
    }

    /// Loads a KeyManager from a hex-encoded private key (with or without 0x prefix).
    ///
    /// # Errors
    /// Returns error if:
    /// - The key is not valid hex
    /// - The bytes are not a valid secp256k1 secret scalar
    pub fn from_private_key(private_key: &str) -> Result<Self, KeyError> {
        let private_key = private_key.trim();
        let bytes = hex::decode(private_key.strip_prefix("0x").unwrap_or(private_key))?;
        let signing_key = SigningKey::from_slice(&bytes).map_err(|_| KeyError::InvalidKey)?;
        Ok(KeyManager {
            wallet: LocalWallet::from(signing_key),
        })
    }

    /// Address controlled by this key.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Underlying wallet, used to sign registry transactions.
    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }

    /// Signs `message` as an EIP-191 personal message.
    ///
    /// # Returns
    /// 65-byte recoverable signature (R || S || V)
    pub async fn sign_message(&self, message: &str) -> Result<Signature, WalletError> {
        self.wallet.sign_message(message).await
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}
