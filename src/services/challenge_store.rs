// src/services/challenge_store.rs
//! Storage of outstanding authentication challenges.
//!
//! At most one challenge is active per address. The store is shared between
//! the authentication service and the sweeper, so implementations must be
//! safe to call concurrently.

use crate::models::challenge::Challenge;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Keyed store of active challenges.
///
/// Addresses are matched case-insensitively.
pub trait ChallengeStore: Send + Sync {
    /// Active challenge for `address`, expired or not.
    fn get(&self, address: &str) -> Option<Challenge>;

    /// Stores `challenge` under its address, returning the one it replaced.
    fn set(&self, challenge: Challenge) -> Option<Challenge>;

    /// Removes the challenge for `address`. Returns true if one was present.
    fn delete(&self, address: &str) -> bool;

    /// Removes the challenge for `address` only if its message is still
    /// `challenge`. Returns true if it was removed by this call.
    fn consume(&self, address: &str, challenge: &str) -> bool;

    /// Removes every challenge expired at `now`. Returns how many were removed.
    fn sweep(&self, now: DateTime<Utc>) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local challenge store guarded by a mutex.
///
/// # Note
/// Nothing is persisted: a restart loses all outstanding challenges and
/// clients have to request new ones.
#[derive(Debug, Default)]
pub struct InMemoryChallengeStore {
    challenges: Mutex<HashMap<String, Challenge>>,
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        InMemoryChallengeStore {
            challenges: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Challenge>> {
        self.challenges.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn key(address: &str) -> String {
    address.to_ascii_lowercase()
}

impl ChallengeStore for InMemoryChallengeStore {
    fn get(&self, address: &str) -> Option<Challenge> {
        self.lock().get(&key(address)).cloned()
    }

    fn set(&self, challenge: Challenge) -> Option<Challenge> {
        self.lock().insert(key(&challenge.address), challenge)
    }

    fn delete(&self, address: &str) -> bool {
        self.lock().remove(&key(address)).is_some()
    }

    fn consume(&self, address: &str, challenge: &str) -> bool {
        let mut challenges = self.lock();
        let key = key(address);
        match challenges.get(&key) {
            Some(stored) if stored.challenge == challenge => {
                challenges.remove(&key);
                true
            }
            _ => false,
        }
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut challenges = self.lock();
        let before = challenges.len();
        challenges.retain(|_, c| !c.is_expired_at(now));
        before - challenges.len()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
