pub mod token;
pub mod votacion;
