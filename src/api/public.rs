use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::crypto::token::VotacionId;
use crate::error::{Error, Result};
use crate::model::{
    api::votacion::{VotacionDescription, VotacionSummary},
    db::votacion::{Votacion, VotacionState},
    mongodb::{u32_id_filter, Coll},
};

pub fn routes() -> Vec<Route> {
    routes![votaciones, votacion]
}

/// List every published votación; drafts are hidden.
#[get("/votaciones")]
async fn votaciones(votaciones: Coll<Votacion>) -> Result<Json<Vec<VotacionSummary>>> {
    let filter = doc! {
        "$or": [{"estado": VotacionState::Activa}, {"estado": VotacionState::Finalizada}],
    };

    let votaciones = votaciones
        .find(filter, None)
        .await?
        .try_collect::<Vec<_>>()
        .await?;

    Ok(Json(votaciones.into_iter().map(Into::into).collect()))
}

#[get("/votaciones/<votacion_id>")]
async fn votacion(
    votacion_id: VotacionId,
    votaciones: Coll<Votacion>,
) -> Result<Json<VotacionDescription>> {
    let filter = doc! {
        "_id": votacion_id,
        "$or": [{"estado": VotacionState::Activa}, {"estado": VotacionState::Finalizada}],
    };

    let votacion = votaciones
        .find_one(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Votación with ID '{votacion_id}'")))?;

    Ok(Json(votacion.into()))
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{http::Status, local::asynchronous::Client, serde::json::serde_json};

    use super::*;

    #[db_test]
    async fn list_hides_drafts(client: Client, db: Database) {
        insert_votaciones(&db).await;

        let response = client.get(uri!(votaciones)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let raw_response = response.into_string().await.unwrap();
        let listed: Vec<VotacionSummary> = serde_json::from_str(&raw_response).unwrap();

        let mut ids: Vec<_> = listed.iter().map(|v| v.id).collect();
        ids.sort_unstable();
        assert_eq!(
            ids,
            vec![
                Votacion::activa_example().id,
                Votacion::finalizada_example().id
            ]
        );
    }

    #[db_test]
    async fn get_published_votacion(client: Client, db: Database) {
        insert_votaciones(&db).await;

        let expected = Votacion::activa_example();
        let response = client.get(uri!(votacion(expected.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let raw_response = response.into_string().await.unwrap();
        let fetched: VotacionDescription = serde_json::from_str(&raw_response).unwrap();
        assert_eq!(fetched.id, expected.id);
        assert_eq!(fetched.titulo, expected.titulo);
        assert_eq!(fetched.estado, expected.estado);
    }

    #[db_test]
    async fn drafts_and_unknown_ids_are_not_found(client: Client, db: Database) {
        insert_votaciones(&db).await;

        let draft = Votacion::borrador_example();
        let response = client.get(uri!(votacion(draft.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        let response = client.get(uri!(votacion(9999u32))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    async fn insert_votaciones(db: &Database) {
        Coll::<Votacion>::from_db(db)
            .insert_many(
                [
                    Votacion::activa_example(),
                    Votacion::borrador_example(),
                    Votacion::finalizada_example(),
                ],
                None,
            )
            .await
            .unwrap();
    }
}
