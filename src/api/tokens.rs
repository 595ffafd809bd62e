use rocket::{serde::json::Json, Route, State};

use crate::crypto::{keys::KeyStore, token};
use crate::error::Result;
use crate::model::{
    api::token::{PublicKeyResponse, TokenVerificationResponse},
    db::votacion::Votacion,
    mongodb::{u32_id_filter, Coll},
};

pub fn routes() -> Vec<Route> {
    routes![public_key, verify_token]
}

/// Publish the verification key. Anyone can re-verify tokens offline with
/// this; no trust in the server is needed at verification time.
#[get("/tokens/public-key")]
async fn public_key(keys: &State<KeyStore>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse::new(keys))
}

/// Publicly verify a token. Cryptographic validity needs no database; the
/// votación lookup is enrichment on top, and only runs for valid tokens.
#[get("/tokens/<token>/verify")]
async fn verify_token(
    token: String,
    keys: &State<KeyStore>,
    votaciones: Coll<Votacion>,
) -> Result<Json<TokenVerificationResponse>> {
    let format_valid = token::is_valid_token_format(&token);
    let result = token::verify_token(&keys.verifying_key(), &token);

    let votacion = match &result.vote_data {
        Some(payload) => votaciones
            .find_one(u32_id_filter(payload.votacion_id), None)
            .await?
            .map(Into::into),
        None => None,
    };

    Ok(Json(TokenVerificationResponse::new(
        token,
        format_valid,
        result,
        votacion,
    )))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mongodb::Database;
    use rocket::{http::Status, local::asynchronous::Client, serde::json::serde_json};
    use serde_json::{json, Value};

    use crate::crypto::token::generate_signed_token;
    use crate::model::api::token::VerificationDetails;

    use super::*;

    fn respuestas() -> crate::crypto::token::Respuestas {
        let Value::Object(map) = json!({"q1": "yes", "q2": ["a", "b"]}) else {
            unreachable!()
        };
        map
    }

    #[db_test]
    async fn public_key_is_served(client: Client, _db: Database) {
        let response = client.get(uri!(public_key)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let raw_response = response.into_string().await.unwrap();
        let key: PublicKeyResponse = serde_json::from_str(&raw_response).unwrap();
        assert_eq!(key.format, "PEM");
        assert_eq!(key.algorithm, "Ed25519");
        assert!(key.public_key.starts_with("-----BEGIN PUBLIC KEY-----"));

        // It must match the key actually in use.
        let keys = client.rocket().state::<KeyStore>().unwrap();
        assert_eq!(key.public_key, keys.public_key_pem());
    }

    #[db_test]
    async fn valid_token_verifies_with_enrichment(client: Client, db: Database) {
        let votacion = Votacion::activa_example();
        Coll::<Votacion>::from_db(&db)
            .insert_one(&votacion, None)
            .await
            .unwrap();

        let keys = client.rocket().state::<KeyStore>().unwrap();
        let token = generate_signed_token(keys, votacion.id, respuestas(), Utc::now()).unwrap();

        let response = client.get(uri!(verify_token(&token))).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let raw_response = response.into_string().await.unwrap();
        let report: TokenVerificationResponse = serde_json::from_str(&raw_response).unwrap();
        assert!(report.is_valid);
        assert!(report.error.is_none());
        assert_eq!(report.token, token);

        let vote_data = report.vote_data.unwrap();
        assert_eq!(vote_data.votacion_id, votacion.id);
        assert_eq!(vote_data.respuestas, respuestas());

        let details = &report.verification_details;
        assert!(details.format_valid);
        assert!(details.signature_valid);
        assert!(details.hash_valid);
        assert!(details.votacion_exists);

        assert_eq!(report.votacion.unwrap().titulo, votacion.titulo);
    }

    #[db_test]
    async fn valid_token_for_unknown_votacion(client: Client, _db: Database) {
        let keys = client.rocket().state::<KeyStore>().unwrap();
        let token = generate_signed_token(keys, 9999, respuestas(), Utc::now()).unwrap();

        let response = client.get(uri!(verify_token(&token))).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let raw_response = response.into_string().await.unwrap();
        let report: TokenVerificationResponse = serde_json::from_str(&raw_response).unwrap();
        // Cryptographically valid even though the votación is gone.
        assert!(report.is_valid);
        assert!(!report.verification_details.votacion_exists);
        assert!(report.votacion.is_none());
    }

    #[db_test]
    async fn garbage_token_reports_invalid_not_error(client: Client, _db: Database) {
        let response = client
            .get(uri!(verify_token("not-a-token")))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let raw_response = response.into_string().await.unwrap();
        let report: TokenVerificationResponse = serde_json::from_str(&raw_response).unwrap();
        assert!(!report.is_valid);
        assert_eq!(report.error.as_deref(), Some("malformed token"));
        assert!(report.vote_data.is_none());
        assert!(report.votacion.is_none());
        assert_eq!(
            report.verification_details,
            VerificationDetails {
                format_valid: false,
                signature_valid: false,
                hash_valid: false,
                votacion_exists: false,
                verified_at: report.verification_details.verified_at,
            }
        );
    }

    #[db_test]
    async fn foreign_signature_reports_forgery(client: Client, _db: Database) {
        let foreign = KeyStore::generate();
        let token = generate_signed_token(&foreign, 42, respuestas(), Utc::now()).unwrap();

        let response = client.get(uri!(verify_token(&token))).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let raw_response = response.into_string().await.unwrap();
        let report: TokenVerificationResponse = serde_json::from_str(&raw_response).unwrap();
        assert!(!report.is_valid);
        assert!(report.verification_details.hash_valid);
        assert!(!report.verification_details.signature_valid);
        assert_eq!(report.error.as_deref(), Some("signature mismatch"));
    }
}
