//! Data models for the persona pipeline.
//!
//! This module contains the core data structures shared by the
//! aggregation, segmentation and lookup stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One observed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Country code (e.g. `usa`, `tur`).
    pub country: String,
    /// Platform the purchase came from (e.g. `android`, `ios`).
    pub platform: String,
    /// Sex code (e.g. `female`, `male`).
    pub sex: String,
    /// Customer age in years.
    pub age: i64,
    /// Revenue amount of the transaction.
    pub price: f64,
}

impl Record {
    pub fn new(
        country: impl Into<String>,
        platform: impl Into<String>,
        sex: impl Into<String>,
        age: i64,
        price: f64,
    ) -> Self {
        Self {
            country: country.into(),
            platform: platform.into(),
            sex: sex.into(),
            age,
            price,
        }
    }
}

/// Half-open age interval `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgeBucket {
    pub low: i64,
    pub high: i64,
}

impl AgeBucket {
    pub fn contains(&self, age: i64) -> bool {
        self.low <= age && age < self.high
    }

    /// Inclusive upper bound, as written in persona keys.
    pub fn last_age(&self) -> i64 {
        self.high - 1
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.last_age())
    }
}

/// A revenue tier. Higher `rank` means higher expected revenue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub rank: usize,
    pub label: String,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Mean revenue and sample size of one persona.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonaStats {
    /// Arithmetic mean of `price` over the persona's records.
    pub mean_price: f64,
    /// Number of records behind the mean. Always at least 1.
    pub count: usize,
}

/// A row of the persona table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaEntry {
    pub mean_price: f64,
    pub count: usize,
    pub segment: Segment,
}

/// Summary statistics of one segment, computed over persona means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentStats {
    pub segment: Segment,
    /// Number of personas in the segment.
    pub personas: usize,
    /// Number of records behind those personas.
    pub records: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_contains_is_half_open() {
        let bucket = AgeBucket { low: 24, high: 31 };
        assert!(bucket.contains(24));
        assert!(bucket.contains(30));
        assert!(!bucket.contains(31));
        assert!(!bucket.contains(23));
        assert_eq!(bucket.last_age(), 30);
        assert_eq!(bucket.to_string(), "24-30");
    }

    #[test]
    fn test_segment_ordering_follows_rank() {
        let low = Segment {
            rank: 0,
            label: "D".to_string(),
        };
        let high = Segment {
            rank: 3,
            label: "A".to_string(),
        };
        assert!(low < high);
        assert_eq!(high.to_string(), "A");
    }
}
