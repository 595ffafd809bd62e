use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::crypto::token::VotacionId;

/// A stored vote. The ballot content itself lives inside the token
/// envelope; the vote document exists for uniqueness enforcement and
/// listing, never for re-deriving the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voto {
    /// The votación this vote belongs to.
    pub votacion_id: VotacionId,
    /// The signed token, unique per cast ballot. Unbounded text: the
    /// envelope embeds the full payload plus signature, so it must never
    /// be truncated to a fixed-length column.
    pub token: String,
    /// The content hash, duplicated out of the envelope for audit queries.
    pub vote_hash: String,
    /// When the vote was cast; also the timestamp inside the token.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}
