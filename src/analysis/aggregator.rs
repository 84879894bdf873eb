//! Persona aggregation.
//!
//! Groups records by (country, platform, sex, age bucket) and computes the
//! mean price of each group. Records with an age outside every bucket are
//! dropped and counted.

use crate::error::PersonaError;
use crate::models::{PersonaStats, Record};
use crate::persona::{AgeBuckets, PersonaKey};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Result of aggregating a batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregate {
    /// Mean price and count per persona, in key order.
    pub personas: BTreeMap<PersonaKey, PersonaStats>,
    /// Records skipped because their age has no bucket.
    pub dropped: usize,
}

impl Aggregate {
    /// Number of records that contributed to some persona.
    pub fn records_used(&self) -> usize {
        self.personas.values().map(|s| s.count).sum()
    }

    /// Mean price per persona, the input of the segmenter.
    pub fn means(&self) -> BTreeMap<PersonaKey, f64> {
        self.personas
            .iter()
            .map(|(key, stats)| (key.clone(), stats.mean_price))
            .collect()
    }
}

/// Running arithmetic mean.
#[derive(Debug, Clone, Copy, Default)]
struct RunningMean {
    mean: f64,
    count: usize,
}

impl RunningMean {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
    }
}

/// Aggregate records into per-persona mean prices.
///
/// Unbucketable ages are counted in [`Aggregate::dropped`]. A categorical code
/// that cannot form a key fails the whole aggregation.
pub fn aggregate(records: &[Record], buckets: &AgeBuckets) -> Result<Aggregate, PersonaError> {
    let mut groups: BTreeMap<PersonaKey, RunningMean> = BTreeMap::new();
    let mut dropped = 0;

    for record in records {
        let bucket = match buckets.bucket(record.age) {
            Ok(bucket) => bucket,
            Err(e) => {
                debug!("Dropping record: {}", e);
                dropped += 1;
                continue;
            }
        };

        let key = PersonaKey::new(&record.country, &record.platform, &record.sex, bucket)?;
        groups.entry(key).or_default().push(record.price);
    }

    if dropped > 0 {
        warn!(
            "Dropped {} of {} records with ages outside [{}, {})",
            dropped,
            records.len(),
            buckets.range().0,
            buckets.range().1
        );
    }

    let personas = groups
        .into_iter()
        .map(|(key, acc)| {
            (
                key,
                PersonaStats {
                    mean_price: acc.mean,
                    count: acc.count,
                },
            )
        })
        .collect();

    Ok(Aggregate { personas, dropped })
}
