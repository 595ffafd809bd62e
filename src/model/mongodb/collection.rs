use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{votacion::Votacion, voto::Voto};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// Votación collection
const VOTACIONES: &str = "votaciones";
impl MongoCollection for Votacion {
    const NAME: &'static str = VOTACIONES;
}

// Voto collection
const VOTOS: &str = "votos";
impl MongoCollection for Voto {
    const NAME: &'static str = VOTOS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Every cast ballot gets a globally unique token.
    let token_index = IndexModel::builder()
        .keys(doc! {"token": 1})
        .options(unique)
        .build();
    Coll::<Voto>::from_db(db)
        .create_index(token_index, None)
        .await?;

    // Per-votación listing of votes.
    let votacion_index = IndexModel::builder()
        .keys(doc! {"votacion_id": 1, "cast_at": 1})
        .build();
    Coll::<Voto>::from_db(db)
        .create_index(votacion_index, None)
        .await?;

    Ok(())
}
