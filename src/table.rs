//! The persona lookup table.
//!
//! Built once from a full batch and read-only afterwards.

use crate::analysis::{aggregate, Segmenter};
use crate::error::PersonaError;
use crate::models::{PersonaEntry, Record, Segment, SegmentStats};
use crate::persona::{AgeBuckets, PersonaKey};
use std::collections::BTreeMap;
use tracing::info;

/// Mapping from persona key to expected revenue and segment.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaTable {
    entries: BTreeMap<PersonaKey, PersonaEntry>,
    buckets: AgeBuckets,
    segments: Vec<Segment>,
    edges: Vec<f64>,
    dropped: usize,
}

impl PersonaTable {
    /// Aggregate and segment `records` into a table.
    ///
    /// Fails without returning a partial table if any record has an unusable
    /// categorical code or if no record survives bucketing.
    pub fn build(
        records: &[Record],
        buckets: &AgeBuckets,
        segmenter: &Segmenter,
    ) -> Result<Self, PersonaError> {
        let aggregate = aggregate(records, buckets)?;
        if aggregate.personas.is_empty() {
            return Err(PersonaError::EmptyBatch);
        }

        let segmentation = segmenter.segment(&aggregate.means())?;

        // Both maps are keyed by the same personas, so their orders line up.
        let entries: BTreeMap<PersonaKey, PersonaEntry> = aggregate
            .personas
            .into_iter()
            .zip(segmentation.assignments.into_values())
            .map(|((key, stats), segment)| {
                (
                    key,
                    PersonaEntry {
                        mean_price: stats.mean_price,
                        count: stats.count,
                        segment,
                    },
                )
            })
            .collect();

        info!(
            "Built persona table: {} personas from {} records ({} dropped)",
            entries.len(),
            records.len(),
            aggregate.dropped
        );

        Ok(Self {
            entries,
            buckets: buckets.clone(),
            segments: segmenter.segments().collect(),
            edges: segmentation.edges,
            dropped: aggregate.dropped,
        })
    }

    /// Look up a persona.
    pub fn lookup(&self, key: &PersonaKey) -> Result<&PersonaEntry, PersonaError> {
        self.entries
            .get(key)
            .ok_or_else(|| PersonaError::PersonaNotFound {
                key: key.to_string(),
            })
    }

    /// Parse a key string and look it up.
    ///
    /// Returns `InvalidKey` for malformed strings and for age ranges this
    /// table's buckets cannot produce, and `PersonaNotFound` for well-formed
    /// keys that were never observed.
    pub fn lookup_str(&self, raw: &str) -> Result<(PersonaKey, &PersonaEntry), PersonaError> {
        let key: PersonaKey = raw.parse()?;
        let bucket = key.bucket();
        if self.buckets.find(bucket.low, bucket.high).is_none() {
            return Err(PersonaError::InvalidKey {
                key: raw.to_string(),
                reason: "age range is not a configured bucket".to_string(),
            });
        }
        let entry = self.lookup(&key)?;
        Ok((key, entry))
    }

    /// All entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&PersonaKey, &PersonaEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bucketizer the table was built with. Lookups must reuse it.
    pub fn buckets(&self) -> &AgeBuckets {
        &self.buckets
    }

    /// Segments in ascending rank.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Quantile edges used to assign segments.
    pub fn quantile_edges(&self) -> &[f64] {
        &self.edges
    }

    /// Records dropped for having an unbucketable age.
    pub fn dropped_records(&self) -> usize {
        self.dropped
    }

    /// Records that contributed to some persona.
    pub fn records_used(&self) -> usize {
        self.entries.values().map(|e| e.count).sum()
    }

    /// Personas of one segment, in key order.
    pub fn in_segment<'a>(
        &'a self,
        label: &'a str,
    ) -> impl Iterator<Item = (&'a PersonaKey, &'a PersonaEntry)> + 'a {
        self.entries
            .iter()
            .filter(move |(_, e)| e.segment.label == label)
    }

    /// Per-segment statistics over persona means, lowest segment first.
    pub fn segment_stats(&self) -> Vec<SegmentStats> {
        self.segments
            .iter()
            .map(|segment| {
                let means: Vec<(f64, usize)> = self
                    .in_segment(&segment.label)
                    .map(|(_, e)| (e.mean_price, e.count))
                    .collect();

                if means.is_empty() {
                    return SegmentStats {
                        segment: segment.clone(),
                        personas: 0,
                        records: 0,
                        mean: 0.0,
                        min: 0.0,
                        max: 0.0,
                        sum: 0.0,
                    };
                }

                let sum: f64 = means.iter().map(|(m, _)| m).sum();
                SegmentStats {
                    segment: segment.clone(),
                    personas: means.len(),
                    records: means.iter().map(|(_, c)| c).sum(),
                    mean: sum / means.len() as f64,
                    min: means.iter().map(|(m, _)| *m).fold(f64::INFINITY, f64::min),
                    max: means.iter().map(|(m, _)| *m).fold(f64::NEG_INFINITY, f64::max),
                    sum,
                }
            })
            .collect()
    }
}
