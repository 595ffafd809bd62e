use chrono::{DateTime, Utc};
use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, to_bson, Bson};
use serde::{Deserialize, Serialize};

use crate::crypto::token::VotacionId;

/// A stored votación.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Votacion {
    /// Votación unique ID.
    #[serde(rename = "_id")]
    pub id: VotacionId,
    /// Title shown to voters.
    pub titulo: String,
    /// Optional longer description.
    pub descripcion: Option<String>,
    /// Votación state.
    pub estado: VotacionState,
    /// Voting opens.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub fecha_inicio: DateTime<Utc>,
    /// Voting closes.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub fecha_fin: DateTime<Utc>,
}

impl Votacion {
    /// Can votes be cast right now?
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.estado == VotacionState::Activa && self.fecha_inicio <= now && now < self.fecha_fin
    }
}

/// States in the votación lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VotacionState {
    /// Under construction, not yet visible.
    Borrador,
    /// Published; accepts votes between `fecha_inicio` and `fecha_fin`.
    Activa,
    /// Closed; results and tokens remain verifiable indefinitely.
    Finalizada,
}

impl From<VotacionState> for Bson {
    fn from(state: VotacionState) -> Self {
        to_bson(&state).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod examples {
    use chrono::Duration;

    use super::*;

    impl Votacion {
        /// An open votación accepting votes right now.
        pub fn activa_example() -> Self {
            Self {
                id: 42,
                titulo: "Presupuesto participativo 2025".to_string(),
                descripcion: Some("Asignación del presupuesto del distrito".to_string()),
                estado: VotacionState::Activa,
                fecha_inicio: Utc::now() - Duration::hours(1),
                fecha_fin: Utc::now() + Duration::hours(1),
            }
        }

        /// A draft votación, hidden from the public listing.
        pub fn borrador_example() -> Self {
            Self {
                id: 43,
                titulo: "Consulta sin publicar".to_string(),
                descripcion: None,
                estado: VotacionState::Borrador,
                fecha_inicio: Utc::now() + Duration::days(1),
                fecha_fin: Utc::now() + Duration::days(2),
            }
        }

        /// A finished votación that no longer accepts votes.
        pub fn finalizada_example() -> Self {
            Self {
                id: 44,
                titulo: "Elección de junta vecinal".to_string(),
                descripcion: None,
                estado: VotacionState::Finalizada,
                fecha_inicio: Utc::now() - Duration::days(2),
                fecha_fin: Utc::now() - Duration::days(1),
            }
        }
    }
}
