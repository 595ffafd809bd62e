use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::token::VotacionId;
use crate::model::db::votacion::{Votacion, VotacionState};

/// An API-friendly votación description, without storage-specific formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotacionDescription {
    pub id: VotacionId,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub estado: VotacionState,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin: DateTime<Utc>,
}

impl From<Votacion> for VotacionDescription {
    fn from(votacion: Votacion) -> Self {
        Self {
            id: votacion.id,
            titulo: votacion.titulo,
            descripcion: votacion.descripcion,
            estado: votacion.estado,
            fecha_inicio: votacion.fecha_inicio,
            fecha_fin: votacion.fecha_fin,
        }
    }
}

/// The short form used in listings and token-verification enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotacionSummary {
    pub id: VotacionId,
    pub titulo: String,
    pub estado: VotacionState,
    pub fecha_fin: DateTime<Utc>,
}

impl From<Votacion> for VotacionSummary {
    fn from(votacion: Votacion) -> Self {
        Self {
            id: votacion.id,
            titulo: votacion.titulo,
            estado: votacion.estado,
            fecha_fin: votacion.fecha_fin,
        }
    }
}
