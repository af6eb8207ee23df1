// src/models/did.rs
//! Address-keyed decentralized identifier.
//!
//! Identifiers have the shape
//! ```text
//! id:<method>:<network>:<address>
//! ```
//! where `method` is a lowercase token (e.g. `ethr`), `network` names the chain
//! (e.g. `sepolia`) and `address` is a `0x`-prefixed 20-byte hex address.
//! Identifiers built by this crate always carry the address in lower case.

use ethers_core::types::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Literal scheme token every identifier starts with.
pub const DID_SCHEME: &str = "id";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DidParseError {
    #[error("expected the `id:` scheme")]
    InvalidScheme,
    #[error("expected id:method, but method was not present or not lowercase")]
    InvalidMethod,
    #[error("expected id:method:network, but network was not present or malformed")]
    InvalidNetwork,
    #[error("final segment is not a 0x-prefixed 20-byte hex address")]
    InvalidAddress,
    #[error("identifier has trailing segments")]
    TrailingSegments,
}

/// A parsed identifier. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Did {
    method: String,
    network: String,
    address: String,
}

impl Did {
    /// Builds the identifier for `address` under `method` and `network`.
    pub fn new(method: &str, network: &str, address: Address) -> Self {
        Did {
            method: method.to_string(),
            network: network.to_string(),
            address: format!("0x{:x}", address),
        }
    }

    /// Returns true iff `s` is a syntactically valid identifier.
    pub fn is_valid(s: &str) -> bool {
        s.parse::<Did>().is_ok()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// The address segment exactly as it appears in the identifier.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Id of the `n`-th key in this identity's document, e.g. `...#key-1`.
    pub fn key_id(&self, n: usize) -> String {
        format!("{}#key-{}", self, n)
    }

    /// Id of a named service in this identity's document.
    pub fn service_id(&self, name: &str) -> String {
        format!("{}#{}", self, name)
    }
}

fn is_method_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

fn is_network_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn is_address_segment(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

impl FromStr for Did {
    type Err = DidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        if parts.next() != Some(DID_SCHEME) {
            return Err(DidParseError::InvalidScheme);
        }
        let method = parts
            .next()
            .filter(|m| is_method_token(m))
            .ok_or(DidParseError::InvalidMethod)?;
        let network = parts
            .next()
            .filter(|n| is_network_token(n))
            .ok_or(DidParseError::InvalidNetwork)?;
        let address = parts
            .next()
            .filter(|a| is_address_segment(a))
            .ok_or(DidParseError::InvalidAddress)?;
        if parts.next().is_some() {
            return Err(DidParseError::TrailingSegments);
        }

        Ok(Did {
            method: method.to_string(),
            network: network.to_string(),
            address: address.to_string(),
        })
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            DID_SCHEME, self.method, self.network, self.address
        )
    }
}

impl Serialize for Did {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
