//! Persona identity: age bucketing and canonical keys.

pub mod bucket;
pub mod key;

pub use bucket::AgeBuckets;
pub use key::{PersonaKey, KEY_DELIMITER};
