pub mod votacion;
pub mod voto;
