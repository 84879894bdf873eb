//! Typed errors raised by the persona pipeline.
//!
//! Application-level failures (I/O, CSV parsing, config files) use `anyhow`;
//! the variants here are the ones callers are expected to match on.

use thiserror::Error;

/// Errors produced while bucketing, keying, building or querying a persona table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PersonaError {
    #[error("age {age} is outside the configured bucket range [{low}, {high})")]
    UnbucketableAge { age: i64, low: i64, high: i64 },

    #[error("invalid {field} value: '{value}'")]
    InvalidCategoricalValue { field: &'static str, value: String },

    #[error("no such persona: {key}")]
    PersonaNotFound { key: String },

    #[error("malformed persona key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid bucket boundaries: {0}")]
    InvalidBoundaries(String),

    #[error("invalid segment labels: {0}")]
    InvalidLabels(String),

    #[error("no records left to aggregate")]
    EmptyBatch,
}

impl PersonaError {
    /// True for errors caused by a bad field value, which an interactive caller may retry.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PersonaError::UnbucketableAge { .. } | PersonaError::InvalidCategoricalValue { .. }
        )
    }
}
