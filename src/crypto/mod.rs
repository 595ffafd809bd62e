//! The anonymous-vote token core: key management, canonical payload
//! hashing, and the signed token codec.
//!
//! Everything in here is pure and synchronous apart from the one-time key
//! load; verification needs no database and is safe to run against fully
//! attacker-controlled input.

pub mod canonical;
pub mod keys;
pub mod token;
