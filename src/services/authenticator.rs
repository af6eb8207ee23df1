// src/services/authenticator.rs
//! Challenge-response authentication of address holders.
//!
//! Per address a challenge moves through `NONE -> ISSUED -> CONSUMED | EXPIRED`.
//! Issuing a new challenge silently discards the previous one. A challenge is
//! consumed by the first successful authentication and is never reused.

use crate::error::IdentityError;
use crate::models::challenge::Challenge;
use crate::services::challenge_store::ChallengeStore;
use crate::services::identity_manager::IdentityManager;
use crate::utils::clock::Clock;
use crate::utils::crypto::{addresses_match, format_address, parse_address, recover_signer};
use chrono::Duration;
use ethers_core::utils::hex;
use log::{debug, info, warn};
use rand::RngCore;
use std::sync::Arc;

/// Default lifetime of a challenge.
pub const DEFAULT_CHALLENGE_TTL_SECS: i64 = 15 * 60;

pub struct AuthService {
    identities: Arc<IdentityManager>,
    store: Arc<dyn ChallengeStore>,
    clock: Arc<dyn Clock>,
    challenge_ttl: Duration,
    /// Human-readable name of the relying party, embedded in every challenge
    protocol_label: String,
}

impl AuthService {
    pub fn new(
        identities: Arc<IdentityManager>,
        store: Arc<dyn ChallengeStore>,
        clock: Arc<dyn Clock>,
        challenge_ttl: Duration,
        protocol_label: &str,
    ) -> Self {
        AuthService {
            identities,
            store,
            clock,
            challenge_ttl,
            protocol_label: protocol_label.to_string(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ChallengeStore> {
        &self.store
    }

    fn challenge_message(&self, address: &str, timestamp_ms: i64, nonce: &str) -> String {
        format!(
            "{} wants you to sign in with your account:\n{}\n\nNetwork: {}\nNonce: {}\nIssued At: {}",
            self.protocol_label,
            address,
            self.identities.registry().network(),
            nonce,
            timestamp_ms
        )
    }

    /// Issues a challenge for `address`, replacing any outstanding one.
    ///
    /// The returned `challenge` string must be signed as a personal message
    /// by the holder of `address` and passed to [`authenticate`](Self::authenticate).
    ///
    /// # Errors
    /// `InvalidAddress` if `address` is not a 20-byte hex address.
    pub fn generate_challenge(&self, address: &str) -> Result<Challenge, IdentityError> {
        let address = format_address(parse_address(address)?);
        let timestamp = self.clock.now();

        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        let nonce = hex::encode(nonce);

        let challenge = Challenge {
            challenge: self.challenge_message(&address, timestamp.timestamp_millis(), &nonce),
            address: address.clone(),
            timestamp,
            expires_at: timestamp + self.challenge_ttl,
            nonce,
        };
        if self.store.set(challenge.clone()).is_some() {
            debug!("discarded previous challenge for {}", address);
        }
        info!("issued challenge for {} (expires {})", address, challenge.expires_at);
        Ok(challenge)
    }

    /// Authenticates the holder of `address` as the subject of `identifier`.
    ///
    /// Checks, in order, stopping at the first failure:
    /// 1. an active challenge exists for `address` (`ChallengeNotFound`)
    /// 2. it has not expired; an expired challenge is removed (`ChallengeExpired`)
    /// 3. `identifier` resolves to a document (`NotFound`)
    /// 4. the address embedded in `identifier` is `address` (`IdentifierMismatch`)
    /// 5. `signature` over the exact challenge recovers to `address`
    ///    (`SignatureMismatch`)
    ///
    /// On success the challenge is consumed. Failures at steps 3 to 5 leave it
    /// in place until it expires.
    pub async fn authenticate(
        &self,
        identifier: &str,
        signature: &str,
        address: &str,
    ) -> Result<(), IdentityError> {
        match self.check(identifier, signature, address).await {
            Ok(()) => {
                info!("authenticated {} as {}", address, identifier);
                Ok(())
            }
            Err(err) => {
                warn!("rejected authentication of {} as {}: {}", address, identifier, err);
                Err(err)
            }
        }
    }

    async fn check(&self, identifier: &str, signature: &str, address: &str) -> Result<(), IdentityError> {
        let stored = self
            .store
            .get(address)
            .ok_or_else(|| IdentityError::ChallengeNotFound(address.to_string()))?;

        if stored.is_expired_at(self.clock.now()) {
            self.store.consume(address, &stored.challenge);
            return Err(IdentityError::ChallengeExpired(address.to_string()));
        }

        self.identities.resolve_document(identifier).await?;

        let embedded = self.identities.registry().extract_address(identifier);
        if !embedded.is_some_and(|embedded| addresses_match(&embedded, address)) {
            return Err(IdentityError::IdentifierMismatch {
                identifier: identifier.to_string(),
                address: address.to_string(),
            });
        }

        let recovered = format_address(recover_signer(&stored.challenge, signature)?);
        if !addresses_match(&recovered, address) {
            return Err(IdentityError::SignatureMismatch {
                expected: address.to_string(),
                recovered,
            });
        }

        // Lost a race with another authentication, a replacement or the sweeper
        if !self.store.consume(address, &stored.challenge) {
            return Err(IdentityError::ChallengeNotFound(address.to_string()));
        }
        Ok(())
    }

    /// True iff `identifier` is well-formed, embeds `address`, and the registry
    /// records `address` as its owner. The registry is only queried when the
    /// first two checks pass.
    pub async fn verify_ownership(&self, identifier: &str, address: &str) -> Result<bool, IdentityError> {
        let registry = self.identities.registry();
        if !registry.validate_format(identifier) {
            return Ok(false);
        }
        match registry.extract_address(identifier) {
            Some(embedded) if addresses_match(&embedded, address) => {}
            _ => return Ok(false),
        }
        self.identities.is_owner(identifier, address).await
    }

    /// Removes every expired challenge. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let removed = self.store.sweep(self.clock.now());
        if removed > 0 {
            debug!("swept {} expired challenges", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::memory_registry::InMemoryRegistry;
    use crate::services::challenge_store::InMemoryChallengeStore;
    use crate::services::document_builder::DocumentBuilder;
    use crate::services::registry_client::RegistryClient;
    use crate::utils::clock::ManualClock;
    use crate::wallet::key_management::KeyManager;
    use chrono::Utc;
    use std::time::Duration as StdDuration;

    struct Harness {
        registry: Arc<InMemoryRegistry>,
        clock: Arc<ManualClock>,
        identities: Arc<IdentityManager>,
        auth: AuthService,
    }

    fn harness() -> Harness {
        let registry = Arc::new(InMemoryRegistry::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let client = RegistryClient::new(registry.clone(), "ethr", "sepolia", StdDuration::from_secs(5));
        let builder = DocumentBuilder::new("https://id.example/profile", clock.clone());
        let identities = Arc::new(IdentityManager::new(client, builder, clock.clone()));
        let auth = AuthService::new(
            identities.clone(),
            Arc::new(InMemoryChallengeStore::new()),
            clock.clone(),
            Duration::seconds(DEFAULT_CHALLENGE_TTL_SECS),
            "Test Relying Party",
        );
        Harness { registry, clock, identities, auth }
    }

    /// Registers an identity for a fresh key and returns (key, identifier, address).
    async fn registered(h: &Harness) -> (KeyManager, String, String) {
        let key = KeyManager::new();
        let user = h.identities.create(&key).await.unwrap();
        (key, user.identifier, user.address)
    }

    async fn sign(key: &KeyManager, message: &str) -> String {
        key.sign_message(message).await.unwrap().to_string()
    }

    #[tokio::test]
    async fn test_challenge_contents() {
        let h = harness();
        let address = "0xAbC0000000000000000000000000000000000123";
        let challenge = h.auth.generate_challenge(address).unwrap();

        assert_eq!(challenge.address, address.to_ascii_lowercase());
        assert_eq!(challenge.timestamp, h.clock.now());
        assert_eq!(challenge.expires_at, h.clock.now() + Duration::minutes(15));
        assert_eq!(challenge.nonce.len(), 32);
        assert!(challenge.challenge.contains(&challenge.address));
        assert!(challenge.challenge.contains(&challenge.nonce));
        assert!(challenge.challenge.contains("sepolia"));
        assert!(challenge.challenge.contains("Test Relying Party"));
        assert!(challenge
            .challenge
            .contains(&challenge.timestamp.timestamp_millis().to_string()));
    }

    #[tokio::test]
    async fn test_generate_challenge_rejects_bad_address() {
        let h = harness();
        assert!(matches!(
            h.auth.generate_challenge("0x1234"),
            Err(IdentityError::InvalidAddress(_))
        ));
        assert!(h.auth.store().is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_success_consumes_challenge() {
        let h = harness();
        let (key, identifier, address) = registered(&h).await;

        let challenge = h.auth.generate_challenge(&address).unwrap();
        let signature = sign(&key, &challenge.challenge).await;

        h.auth.authenticate(&identifier, &signature, &address).await.unwrap();
        assert!(h.auth.store().get(&address).is_none());

        let again = h.auth.authenticate(&identifier, &signature, &address).await;
        assert_eq!(again, Err(IdentityError::ChallengeNotFound(address)));
    }

    #[tokio::test]
    async fn test_claimed_address_case_is_irrelevant() {
        let h = harness();
        let (key, identifier, address) = registered(&h).await;
        let upper = format!("0x{}", address[2..].to_ascii_uppercase());

        let challenge = h.auth.generate_challenge(&upper).unwrap();
        let signature = sign(&key, &challenge.challenge).await;
        h.auth.authenticate(&identifier, &signature, &upper).await.unwrap();
    }

    #[tokio::test]
    async fn test_new_challenge_invalidates_previous() {
        let h = harness();
        let (key, identifier, address) = registered(&h).await;

        let first = h.auth.generate_challenge(&address).unwrap();
        let second = h.auth.generate_challenge(&address).unwrap();
        assert_ne!(first.challenge, second.challenge);
        assert_eq!(h.auth.store().len(), 1);

        let stale = sign(&key, &first.challenge).await;
        assert!(matches!(
            h.auth.authenticate(&identifier, &stale, &address).await,
            Err(IdentityError::SignatureMismatch { .. })
        ));
        assert_eq!(h.auth.store().get(&address), Some(second.clone()));

        let fresh = sign(&key, &second.challenge).await;
        h.auth.authenticate(&identifier, &fresh, &address).await.unwrap();
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let h = harness();
        let (key, identifier, address) = registered(&h).await;

        let challenge = h.auth.generate_challenge(&address).unwrap();
        let signature = sign(&key, &challenge.challenge).await;

        h.clock.set(challenge.timestamp + Duration::minutes(15) - Duration::milliseconds(1));
        h.auth.authenticate(&identifier, &signature, &address).await.unwrap();

        let challenge = h.auth.generate_challenge(&address).unwrap();
        let signature = sign(&key, &challenge.challenge).await;
        h.clock.set(challenge.timestamp + Duration::minutes(15) + Duration::milliseconds(1));
        let err = h.auth.authenticate(&identifier, &signature, &address).await;
        assert_eq!(err, Err(IdentityError::ChallengeExpired(address.clone())));
        assert!(h.auth.store().get(&address).is_none());
    }

    #[tokio::test]
    async fn test_signature_over_other_message() {
        let h = harness();
        let (key, identifier, address) = registered(&h).await;

        let challenge = h.auth.generate_challenge(&address).unwrap();
        let mut tampered = challenge.challenge.clone();
        tampered.push(' ');
        let signature = sign(&key, &tampered).await;

        let err = h.auth.authenticate(&identifier, &signature, &address).await;
        assert!(matches!(err, Err(IdentityError::SignatureMismatch { .. })));

        // The challenge survives a rejected signature
        let signature = sign(&key, &challenge.challenge).await;
        h.auth.authenticate(&identifier, &signature, &address).await.unwrap();
    }

    #[tokio::test]
    async fn test_signature_by_other_key() {
        let h = harness();
        let (_, identifier, address) = registered(&h).await;
        let challenge = h.auth.generate_challenge(&address).unwrap();
        let signature = sign(&KeyManager::new(), &challenge.challenge).await;

        let err = h.auth.authenticate(&identifier, &signature, &address).await;
        assert!(matches!(err, Err(IdentityError::SignatureMismatch { .. })));
    }

    #[tokio::test]
    async fn test_malformed_signature() {
        let h = harness();
        let (_, identifier, address) = registered(&h).await;
        h.auth.generate_challenge(&address).unwrap();

        let err = h.auth.authenticate(&identifier, "0xnothex", &address).await;
        assert!(matches!(err, Err(IdentityError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn test_unregistered_identifier() {
        let h = harness();
        let key = KeyManager::new();
        let address = format_address(key.address());
        let identifier = h.identities.registry().identifier_for(key.address()).to_string();

        let challenge = h.auth.generate_challenge(&address).unwrap();
        let signature = sign(&key, &challenge.challenge).await;
        let err = h.auth.authenticate(&identifier, &signature, &address).await;
        assert_eq!(err, Err(IdentityError::NotFound(identifier)));
    }

    #[tokio::test]
    async fn test_identifier_of_someone_else() {
        let h = harness();
        let (_, other_identifier, _) = registered(&h).await;
        let (key, _, address) = registered(&h).await;

        let challenge = h.auth.generate_challenge(&address).unwrap();
        let signature = sign(&key, &challenge.challenge).await;
        let err = h.auth.authenticate(&other_identifier, &signature, &address).await;
        assert!(matches!(err, Err(IdentityError::IdentifierMismatch { .. })));
    }

    #[tokio::test]
    async fn test_no_challenge() {
        let h = harness();
        let (key, identifier, address) = registered(&h).await;
        let signature = sign(&key, "anything").await;
        let err = h.auth.authenticate(&identifier, &signature, &address).await;
        assert_eq!(err, Err(IdentityError::ChallengeNotFound(address)));
    }

    #[tokio::test]
    async fn test_concurrent_authentications_succeed_once() {
        let h = harness();
        let (key, identifier, address) = registered(&h).await;
        let challenge = h.auth.generate_challenge(&address).unwrap();
        let signature = sign(&key, &challenge.challenge).await;

        let (a, b) = tokio::join!(
            h.auth.authenticate(&identifier, &signature, &address),
            h.auth.authenticate(&identifier, &signature, &address),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    }

    #[tokio::test]
    async fn test_verify_ownership() {
        let h = harness();
        let (_, identifier, address) = registered(&h).await;
        let upper = format!("0x{}", address[2..].to_ascii_uppercase());

        assert!(h.auth.verify_ownership(&identifier, &address).await.unwrap());
        assert!(h.auth.verify_ownership(&identifier, &upper).await.unwrap());
        assert!(!h.auth.verify_ownership("id:ethr:sepolia", &address).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_ownership_short_circuits_on_mismatch() {
        let h = harness();
        let (_, identifier, _) = registered(&h).await;
        let calls = h.registry.call_count();

        let stranger = format_address(KeyManager::new().address());
        assert!(!h.auth.verify_ownership(&identifier, &stranger).await.unwrap());
        assert_eq!(h.registry.call_count(), calls);
    }

    #[tokio::test]
    async fn test_verify_ownership_consults_registry_owner() {
        let h = harness();
        let key = KeyManager::new();
        let address = format_address(key.address());
        let identifier = h.identities.registry().identifier_for(key.address()).to_string();

        // Identifier embeds the address, but somebody else wrote it
        let squatter = KeyManager::new();
        let document = DocumentBuilder::new("https://id.example/profile", h.clock.clone())
            .build(&identifier.parse().unwrap(), key.address());
        h.identities
            .registry()
            .write(&identifier, &serde_json::to_string(&document).unwrap(), squatter.wallet())
            .await
            .unwrap();

        assert!(!h.auth.verify_ownership(&identifier, &address).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let h = harness();
        h.auth.generate_challenge("0x0000000000000000000000000000000000000001").unwrap();
        h.clock.advance(Duration::minutes(10));
        h.auth.generate_challenge("0x0000000000000000000000000000000000000002").unwrap();

        h.clock.advance(Duration::minutes(6));
        assert_eq!(h.auth.sweep_expired(), 1);
        assert_eq!(h.auth.store().len(), 1);
    }
}
