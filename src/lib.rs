#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate db_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod model;

/// Construct the rocket instance with all routes and fairings attached.
/// Fairings run in attachment order: the key store needs the config, so
/// `ConfigFairing` must come first.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(config::ConfigFairing)
        .attach(config::KeyStoreFairing)
        .attach(config::DatabaseFairing)
        .attach(logging::LoggerFairing)
}

#[cfg(test)]
async fn client_and_db() -> (rocket::local::asynchronous::Client, mongodb::Database) {
    let client = rocket::local::asynchronous::Client::tracked(build())
        .await
        .expect("Failed to ignite test rocket");
    let db = client
        .rocket()
        .state::<mongodb::Database>()
        .expect("Database not in managed state")
        .clone();
    (client, db)
}
