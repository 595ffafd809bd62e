use chrono::{DateTime, Utc};
use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::crypto::{
    keys::KeyStore,
    token::{Respuestas, TokenEnvelope, VotacionId, VotePayload},
};
use crate::error::{Error, Result};
use crate::model::{
    db::{votacion::Votacion, voto::Voto},
    mongodb::{errors::is_duplicate_key_error, u32_id_filter, Coll},
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote]
}

/// A vote that the user wishes to cast: the answers per question field.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CastVoteRequest {
    pub respuestas: Respuestas,
}

/// What the voter takes away: the self-verifying token and its hash. Keep
/// the token somewhere safe; it is the only link to the ballot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VoteReceipt {
    pub token: String,
    pub vote_hash: String,
    pub timestamp: DateTime<Utc>,
}

/// Cast an anonymous vote in an open votación.
///
/// The finalized vote content is stamped with the current time, signed into
/// a token, and persisted exactly once; the token is never regenerated or
/// mutated afterwards.
#[post("/votaciones/<votacion_id>/votos", data = "<request>", format = "json")]
async fn cast_vote(
    votacion_id: VotacionId,
    request: Json<CastVoteRequest>,
    keys: &State<KeyStore>,
    votaciones: Coll<Votacion>,
    votos: Coll<Voto>,
) -> Result<Json<VoteReceipt>> {
    let votacion = votaciones
        .find_one(u32_id_filter(votacion_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Votación with ID '{votacion_id}'")))?;

    let now = Utc::now();
    if !votacion.is_open(now) {
        return Err(Error::bad_request(format!(
            "Votación '{votacion_id}' is not accepting votes"
        )));
    }

    let respuestas = request.into_inner().respuestas;
    if respuestas.is_empty() {
        return Err(Error::bad_request("A vote needs at least one respuesta"));
    }

    // Seal the payload and persist the vote under its unique token.
    let envelope = TokenEnvelope::seal(
        keys,
        VotePayload {
            votacion_id,
            respuestas,
            timestamp: now,
        },
    )?;
    let token = envelope.encode()?;

    let voto = Voto {
        votacion_id,
        token: token.clone(),
        vote_hash: envelope.vote_hash.clone(),
        cast_at: now,
    };
    match votos.insert_one(&voto, None).await {
        Ok(_) => {}
        Err(err) if is_duplicate_key_error(&err) => {
            // Identical content signed at the exact same instant.
            return Err(Error::conflict("Token already issued"));
        }
        Err(err) => return Err(err.into()),
    }
    info!(
        "Vote cast in votación {votacion_id}, hash {}",
        envelope.vote_hash
    );

    Ok(Json(VoteReceipt {
        token,
        vote_hash: envelope.vote_hash,
        timestamp: now,
    }))
}
