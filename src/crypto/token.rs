//! The signed vote token codec: the only module that knows the wire format.
//!
//! A token is the base64url (no padding) encoding of a compact JSON
//! envelope `{payload, vote_hash, signature}`. `vote_hash` is the lowercase
//! hex SHA-256 of the canonical payload serialization; `signature` is the
//! base64 Ed25519 signature over the 32 raw digest bytes. The envelope
//! embeds the full payload, so a token is self-verifying: no database
//! access is needed to prove authenticity.

use chrono::{DateTime, Utc};
use data_encoding::{BASE64, BASE64URL_NOPAD, HEXLOWER};
use ed25519_dalek::{Signature, Signer, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::{canonical, keys::KeyStore};

/// Unique identifier of a votación.
pub type VotacionId = u32;

/// Per-field answers of a single vote, in submission order.
pub type Respuestas = Map<String, Value>;

#[derive(Debug, Error)]
pub enum TokenError {
    /// The vote content could not be canonically serialised.
    #[error("Invalid vote payload: {0}")]
    PayloadInvalid(#[from] serde_json::Error),
    /// The string is not a well-formed token envelope.
    #[error("Malformed token")]
    Malformed,
}

/// The logical vote content that a token attests to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VotePayload {
    pub votacion_id: VotacionId,
    pub respuestas: Respuestas,
    pub timestamp: DateTime<Utc>,
}

/// The decoded form of a token. Created once at vote-casting time and
/// immutable thereafter; re-verified arbitrarily many times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenEnvelope {
    pub payload: VotePayload,
    /// Lowercase hex SHA-256 of the canonical payload bytes.
    pub vote_hash: String,
    /// Base64 Ed25519 signature over the raw digest bytes.
    pub signature: String,
}

impl TokenEnvelope {
    /// Hash and sign a payload into a sealed envelope.
    pub fn seal(keys: &KeyStore, payload: VotePayload) -> Result<Self, TokenError> {
        let digest = canonical::hash(&payload)?;
        let signature = keys.signing_key().sign(&digest);
        Ok(Self {
            payload,
            vote_hash: HEXLOWER.encode(&digest),
            signature: BASE64.encode(&signature.to_bytes()),
        })
    }

    /// Serialize into the opaque token string.
    pub fn encode(&self) -> Result<String, TokenError> {
        let json = serde_json::to_vec(self)?;
        Ok(BASE64URL_NOPAD.encode(&json))
    }

    /// Parse a token string. Any structural problem (bad alphabet, bad
    /// JSON, missing or extra fields) collapses to [`TokenError::Malformed`].
    pub fn decode(token: &str) -> Result<Self, TokenError> {
        let bytes = BASE64URL_NOPAD
            .decode(token.as_bytes())
            .map_err(|_| TokenError::Malformed)?;
        serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
    }
}

/// Cheap structural pre-check: does the string decode to an envelope of the
/// expected shape? Non-cryptographic, and never errors.
pub fn is_valid_token_format(token: &str) -> bool {
    TokenEnvelope::decode(token).is_ok()
}

/// Sign the given vote content into a token string.
///
/// Signing-key unavailability surfaces at startup when the [`KeyStore`] is
/// built, so the only per-call failure is non-serializable vote content.
pub fn generate_signed_token(
    keys: &KeyStore,
    votacion_id: VotacionId,
    respuestas: Respuestas,
    timestamp: DateTime<Utc>,
) -> Result<String, TokenError> {
    let payload = VotePayload {
        votacion_id,
        respuestas,
        timestamp,
    };
    TokenEnvelope::seal(keys, payload)?.encode()
}

/// The outcome of verifying one token. All failures are reported in-band;
/// this is the public-endpoint contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    pub is_valid: bool,
    pub signature_valid: bool,
    pub hash_valid: bool,
    pub vote_data: Option<VotePayload>,
    pub error: Option<String>,
}

impl VerificationResult {
    fn malformed() -> Self {
        Self {
            is_valid: false,
            signature_valid: false,
            hash_valid: false,
            vote_data: None,
            error: Some("malformed token".to_string()),
        }
    }
}

/// Independently re-verify a token against the public key.
///
/// Never panics or errors, whatever the input: this sits behind an
/// unauthenticated endpoint and must degrade gracefully for hostile
/// strings. The hash and signature checks are computed independently, so
/// callers can tell corruption (`hash_valid == false`) from forgery
/// (`signature_valid == false`).
pub fn verify_token(public_key: &VerifyingKey, token: &str) -> VerificationResult {
    let envelope = match TokenEnvelope::decode(token) {
        Ok(envelope) => envelope,
        Err(_) => return VerificationResult::malformed(),
    };

    // Recompute the content hash from the decoded payload. A payload that
    // just decoded from JSON always re-serialises, but fold any failure
    // into a mismatch rather than panicking.
    let hash_valid = match canonical::hash(&envelope.payload) {
        Ok(digest) => HEXLOWER.encode(&digest) == envelope.vote_hash,
        Err(_) => false,
    };

    // Check the signature against the *embedded* hash, not the recomputed
    // one, so a re-hashed forgery still shows up as a signature failure.
    let signature_valid = HEXLOWER
        .decode(envelope.vote_hash.as_bytes())
        .ok()
        .zip(BASE64.decode(envelope.signature.as_bytes()).ok())
        .and_then(|(digest, sig_bytes)| {
            let signature = Signature::from_slice(&sig_bytes).ok()?;
            Some(public_key.verify(&digest, &signature).is_ok())
        })
        .unwrap_or(false);

    let is_valid = hash_valid && signature_valid;
    let error = if is_valid {
        None
    } else {
        let mut failures = Vec::new();
        if !hash_valid {
            failures.push("hash mismatch");
        }
        if !signature_valid {
            failures.push("signature mismatch");
        }
        Some(failures.join(", "))
    };

    VerificationResult {
        is_valid,
        signature_valid,
        hash_valid,
        vote_data: is_valid.then_some(envelope.payload),
        error,
    }
}
