//! Age bucketing.
//!
//! Boundaries `b0 < b1 < ... < bn` define the buckets
//! `[b0, b1), [b1, b2), ..., [b(n-1), bn)`. Ages outside `[b0, bn)` have no bucket.

use crate::error::PersonaError;
use crate::models::AgeBucket;
use serde::{Deserialize, Serialize};

/// Boundaries used by the reference persona table.
pub const REFERENCE_BOUNDARIES: [i64; 6] = [0, 19, 24, 31, 41, 70];

/// An ordered, gap-free partition of the age domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct AgeBuckets {
    boundaries: Vec<i64>,
}

impl AgeBuckets {
    /// Create a partition from strictly increasing boundaries (at least two).
    pub fn new(boundaries: Vec<i64>) -> Result<Self, PersonaError> {
        if boundaries.len() < 2 {
            return Err(PersonaError::InvalidBoundaries(format!(
                "need at least 2 boundaries, got {}",
                boundaries.len()
            )));
        }
        if let Some(pair) = boundaries.windows(2).find(|w| w[0] >= w[1]) {
            return Err(PersonaError::InvalidBoundaries(format!(
                "boundaries must be strictly increasing ({} >= {})",
                pair[0], pair[1]
            )));
        }
        Ok(Self { boundaries })
    }

    pub fn boundaries(&self) -> &[i64] {
        &self.boundaries
    }

    /// Covered range as `(b0, bn)`; `bn` itself is not covered.
    pub fn range(&self) -> (i64, i64) {
        (self.boundaries[0], self.boundaries[self.boundaries.len() - 1])
    }

    /// All buckets in ascending order.
    pub fn buckets(&self) -> impl Iterator<Item = AgeBucket> + '_ {
        self.boundaries.windows(2).map(|w| AgeBucket {
            low: w[0],
            high: w[1],
        })
    }

    /// Map an age to its bucket.
    pub fn bucket(&self, age: i64) -> Result<AgeBucket, PersonaError> {
        // Index of the first boundary strictly greater than `age`.
        let idx = self.boundaries.partition_point(|b| *b <= age);
        if idx == 0 || idx == self.boundaries.len() {
            let (low, high) = self.range();
            return Err(PersonaError::UnbucketableAge { age, low, high });
        }
        Ok(AgeBucket {
            low: self.boundaries[idx - 1],
            high: self.boundaries[idx],
        })
    }

    /// Find the bucket whose bounds match exactly, as parsed back from a key.
    pub fn find(&self, low: i64, high: i64) -> Option<AgeBucket> {
        self.buckets().find(|b| b.low == low && b.high == high)
    }
}

impl Default for AgeBuckets {
    fn default() -> Self {
        Self {
            boundaries: REFERENCE_BOUNDARIES.to_vec(),
        }
    }
}

impl TryFrom<Vec<i64>> for AgeBuckets {
    type Error = PersonaError;

    fn try_from(boundaries: Vec<i64>) -> Result<Self, Self::Error> {
        Self::new(boundaries)
    }
}

impl From<AgeBuckets> for Vec<i64> {
    fn from(buckets: AgeBuckets) -> Self {
        buckets.boundaries
    }
}
