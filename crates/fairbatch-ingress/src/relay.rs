//! Cross-domain relay attestations.
//!
//! A participant on another domain cannot call the engine directly. An
//! authorized relay forwards the reveal and signs an attestation naming the
//! originator, so the engine checks ownership against the originator rather
//! than the relay.
//!
//! The attestation is an ed25519 signature over
//! `SHA-256("fairbatch:relay:v1:" || commitment_id || originator || origin_domain)`.

use std::collections::HashMap;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use fairbatch_types::{CommitmentId, DomainId, FairbatchError, ParticipantId, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A relay's signed claim that `originator` on `origin_domain` is revealing
/// `commitment_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayAttestation {
    /// Relay's ed25519 public key.
    pub relay_key: [u8; 32],
    pub commitment_id: CommitmentId,
    pub originator: ParticipantId,
    pub origin_domain: DomainId,
    /// 64-byte ed25519 signature.
    pub signature: Vec<u8>,
}

impl RelayAttestation {
    /// Canonical payload the relay signs.
    #[must_use]
    pub fn signing_payload(
        commitment_id: &CommitmentId,
        originator: ParticipantId,
        origin_domain: DomainId,
    ) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"fairbatch:relay:v1:");
        hasher.update(commitment_id.as_bytes());
        hasher.update(originator.as_bytes());
        hasher.update(origin_domain.0.to_le_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }

    /// Produce a signed attestation. Relay-side helper.
    #[must_use]
    pub fn sign(
        signing_key: &SigningKey,
        commitment_id: CommitmentId,
        originator: ParticipantId,
        origin_domain: DomainId,
    ) -> Self {
        let payload = Self::signing_payload(&commitment_id, originator, origin_domain);
        let signature = signing_key.sign(&payload);
        Self {
            relay_key: signing_key.verifying_key().to_bytes(),
            commitment_id,
            originator,
            origin_domain,
            signature: signature.to_bytes().to_vec(),
        }
    }
}

/// The set of relays allowed to reveal on behalf of remote participants.
#[derive(Debug, Default)]
pub struct RelayRegistry {
    authorized: HashMap<[u8; 32], VerifyingKey>,
}

impl RelayRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorize a relay key.
    pub fn authorize(&mut self, key: VerifyingKey) {
        let bytes = key.to_bytes();
        tracing::info!(relay = hex::encode(bytes), "Relay authorized");
        self.authorized.insert(bytes, key);
    }

    /// Revoke a relay key. Returns whether it was authorized.
    pub fn revoke(&mut self, key: &[u8; 32]) -> bool {
        let removed = self.authorized.remove(key).is_some();
        if removed {
            tracing::info!(relay = hex::encode(key), "Relay revoked");
        }
        removed
    }

    #[must_use]
    pub fn is_authorized(&self, key: &[u8; 32]) -> bool {
        self.authorized.contains_key(key)
    }

    /// Check an attestation comes from an authorized relay and is signed.
    ///
    /// # Errors
    /// - `UnauthorizedRelay` for an unknown key
    /// - `InvalidRelaySignature` for a malformed or non-verifying signature
    pub fn verify(&self, attestation: &RelayAttestation) -> Result<()> {
        let key = self.authorized.get(&attestation.relay_key).ok_or_else(|| {
            FairbatchError::UnauthorizedRelay {
                relay_hex: hex::encode(attestation.relay_key),
            }
        })?;
        let signature = Signature::from_slice(&attestation.signature)
            .map_err(|_| FairbatchError::InvalidRelaySignature)?;
        let payload = RelayAttestation::signing_payload(
            &attestation.commitment_id,
            attestation.originator,
            attestation.origin_domain,
        );
        key.verify_strict(&payload, &signature)
            .map_err(|_| FairbatchError::InvalidRelaySignature)
    }
}
