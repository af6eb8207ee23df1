// src/models/user.rs
//! Locally loaded identity record.

use crate::models::document::IdentityDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An identity known to this process, together with its last confirmed document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUser {
    pub identifier: String,
    pub address: String,
    pub document: IdentityDocument,
    pub created_at: DateTime<Utc>,
    pub is_verified: bool,
}
