// src/utils/crypto.rs
//! Cryptographic utilities optimized for blockchain compatibility.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) and EIP-191 personal
//! message signatures, the convention wallets use for `personal_sign`.

use crate::error::IdentityError;
use ethers::types::{Address, Signature};
use ethers::utils::keccak256;
use std::str::FromStr;

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Formats an Ethereum address as a lowercase hex string with 0x prefix.
pub fn format_address(addr: Address) -> String {
    format!("0x{:x}", addr)
}

/// Parses a `0x`-prefixed 20-byte hex address, in any letter case.
pub fn parse_address(address: &str) -> Result<Address, IdentityError> {
    let hex = address
        .strip_prefix("0x")
        .ok_or_else(|| IdentityError::InvalidAddress(address.to_string()))?;
    if hex.len() != 40 {
        return Err(IdentityError::InvalidAddress(address.to_string()));
    }
    Address::from_str(hex).map_err(|_| IdentityError::InvalidAddress(address.to_string()))
}

/// Case-insensitive address comparison.
pub fn addresses_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Recovers the address that produced `signature` over `message`.
///
/// `message` is hashed with the EIP-191 prefix
/// (`"\x19Ethereum Signed Message:\n" + len(message)`) before recovery, so the
/// signature must come from `personal_sign` or an equivalent signer.
///
/// # Errors
/// `InvalidSignature` if the signature is not 65 hex-encoded bytes or is not
/// recoverable.
pub fn recover_signer(message: &str, signature: &str) -> Result<Address, IdentityError> {
    let signature = Signature::from_str(signature)
        .map_err(|e| IdentityError::InvalidSignature(e.to_string()))?;
    signature
        .recover(message)
        .map_err(|e| IdentityError::InvalidSignature(e.to_string()))
}
