// src/models/challenge.rs
//! Authentication challenge issued to an address.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A short-lived, single-use message that the holder of `address` must sign.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    /// Exact message to be signed (EIP-191 personal message)
    pub challenge: String,

    /// Claimant address, lower-cased
    pub address: String,

    pub timestamp: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Random hex nonce embedded in `challenge`
    pub nonce: String,
}

impl Challenge {
    /// A challenge is expired strictly after `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
