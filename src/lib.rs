//! Persona Revenue: rule-based persona revenue table and segmentation.
//!
//! Raw transactions are grouped into personas (country, platform, sex, age
//! range), each persona gets its mean revenue, and personas are split into
//! quartile segments. The resulting table answers "how much will a new
//! customer with this profile spend?".

pub mod analysis;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod lookup;
pub mod models;
pub mod persona;
pub mod report;
pub mod table;

// Re-export public items for easier access
pub use analysis::{aggregate, Aggregate, BatchProfile, Segmenter};
pub use config::Config;
pub use data::load_records;
pub use error::PersonaError;
pub use lookup::{CategoricalDomain, LookupService, ProfileQuery, SessionOutcome};
pub use models::{AgeBucket, PersonaEntry, Record, Segment};
pub use persona::{AgeBuckets, PersonaKey};
pub use table::PersonaTable;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
