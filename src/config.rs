use std::path::PathBuf;

use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::crypto::keys::KeyStore;
use crate::model::mongodb::ensure_indexes_exist;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    signing_key_path: String,
}

impl Config {
    /// Location of the Ed25519 signing key PEM; generated on first run.
    pub fn signing_key_path(&self) -> PathBuf {
        PathBuf::from(&self.signing_key_path)
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// A fairing that loads (or generates) the signing key pair and places the
/// [`KeyStore`] into managed state. Must be attached after [`ConfigFairing`].
/// Key problems are a deployment fault and abort ignition.
pub struct KeyStoreFairing;

#[rocket::async_trait]
impl Fairing for KeyStoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Key store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = rocket.state::<Config>() else {
            error!("Key store requires the config fairing to run first");
            return Err(rocket);
        };
        let path = get_signing_key_path(config);

        let key_store = match KeyStore::load_or_generate(&path) {
            Ok(key_store) => key_store,
            Err(e) => {
                error!("Failed to initialise key store: {e}");
                return Err(rocket);
            }
        };
        info!("Signing key pair online ('{}')", path.display());

        Ok(rocket.manage(key_store))
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        // Ensure the required indexes exist; token uniqueness lives here.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "votaciones".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// Get the signing key location (production version).
#[cfg(not(test))]
fn get_signing_key_path(config: &Config) -> PathBuf {
    config.signing_key_path()
}

/// Get the signing key location (test version).
/// Use a random path so every test gets a fresh key pair.
#[cfg(test)]
fn get_signing_key_path(_config: &Config) -> PathBuf {
    let random: u32 = rand::random();
    std::env::temp_dir().join(format!("votaciones-test-key-{random}.pem"))
}
