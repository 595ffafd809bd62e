use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{
    keys::KeyStore,
    token::{Respuestas, TokenEnvelope, VerificationResult, VotacionId},
};
use crate::model::api::votacion::VotacionSummary;

/// The published verification key, so third parties can verify tokens
/// without trusting this server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    pub public_key: String,
    pub format: String,
    pub algorithm: String,
    pub signature_algorithm: String,
}

impl PublicKeyResponse {
    pub fn new(keys: &KeyStore) -> Self {
        Self {
            public_key: keys.public_key_pem().to_string(),
            format: "PEM".to_string(),
            algorithm: "Ed25519".to_string(),
            signature_algorithm: "Ed25519".to_string(),
        }
    }
}

/// The vote content attested by a verified token, plus its content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteData {
    pub votacion_id: VotacionId,
    pub respuestas: Respuestas,
    pub timestamp: DateTime<Utc>,
    pub vote_hash: String,
}

/// Step-by-step outcome of one verification, to aid auditing: syntactic
/// garbage, tampering and forgery are all distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationDetails {
    pub format_valid: bool,
    pub signature_valid: bool,
    pub hash_valid: bool,
    pub votacion_exists: bool,
    pub verified_at: DateTime<Utc>,
}

/// Full response of the public token-verification endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenVerificationResponse {
    pub is_valid: bool,
    pub error: Option<String>,
    /// The token exactly as submitted.
    pub token: String,
    pub vote_data: Option<VoteData>,
    /// Ballot metadata enrichment; absent when the token is invalid or the
    /// referenced votación is unknown.
    pub votacion: Option<VotacionSummary>,
    pub verification_details: VerificationDetails,
}

impl TokenVerificationResponse {
    /// Assemble the response from the format pre-check, the cryptographic
    /// verdict and the optional enrichment lookup result.
    pub fn new(
        token: String,
        format_valid: bool,
        result: VerificationResult,
        votacion: Option<VotacionSummary>,
    ) -> Self {
        // The envelope re-decodes iff verification got past the parse step.
        let vote_data = result.vote_data.and_then(|payload| {
            let envelope = TokenEnvelope::decode(&token).ok()?;
            Some(VoteData {
                votacion_id: payload.votacion_id,
                respuestas: payload.respuestas,
                timestamp: payload.timestamp,
                vote_hash: envelope.vote_hash,
            })
        });

        Self {
            is_valid: result.is_valid,
            error: result.error,
            verification_details: VerificationDetails {
                format_valid,
                signature_valid: result.signature_valid,
                hash_valid: result.hash_valid,
                votacion_exists: votacion.is_some(),
                verified_at: Utc::now(),
            },
            token,
            vote_data,
            votacion,
        }
    }
}
