//! Quantile segmentation of personas by mean revenue.
//!
//! Quantile estimator (pinned): linear interpolation between order statistics
//! of the sorted persona means, `q(p) = v[floor(h)] + (h - floor(h)) * (v[floor(h)+1] - v[floor(h)])`
//! with `h = (n - 1) * p` (Hyndman & Fan type 7). With `k` labels the edges are
//! `q(0), q(1/k), ..., q(1)`. Bins are right-closed: a value goes to the first
//! segment `i` with `value <= q((i+1)/k)`, so the minimum lands in the lowest
//! segment. Repeated edges leave some segments empty instead of failing.

use crate::error::PersonaError;
use crate::models::Segment;
use crate::persona::PersonaKey;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Labels used by the reference table, lowest revenue first.
pub const REFERENCE_LABELS: [&str; 4] = ["D", "C", "B", "A"];

/// Assigns personas to ordered revenue segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmenter {
    labels: Vec<String>,
}

/// Segment assignment for every persona plus the edges that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// `labels.len() + 1` non-decreasing quantile edges.
    pub edges: Vec<f64>,
    pub assignments: BTreeMap<PersonaKey, Segment>,
}

impl Segmenter {
    /// Create a segmenter from labels ordered lowest tier first.
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Result<Self, PersonaError> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(PersonaError::InvalidLabels(
                "at least one label is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for label in &labels {
            if label.trim().is_empty() {
                return Err(PersonaError::InvalidLabels("labels must not be blank".to_string()));
            }
            if !seen.insert(label.as_str()) {
                return Err(PersonaError::InvalidLabels(format!("duplicate label '{}'", label)));
            }
        }
        Ok(Self { labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// All segments in ascending rank.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.labels.iter().enumerate().map(|(rank, label)| Segment {
            rank,
            label: label.clone(),
        })
    }

    /// Assign each persona a segment based on the quantiles of the mean prices.
    pub fn segment(
        &self,
        personas: &BTreeMap<PersonaKey, f64>,
    ) -> Result<Segmentation, PersonaError> {
        if personas.is_empty() {
            return Err(PersonaError::EmptyBatch);
        }

        let mut sorted: Vec<f64> = personas.values().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let k = self.labels.len();
        let edges: Vec<f64> = (0..=k)
            .map(|i| quantile_sorted(&sorted, i as f64 / k as f64))
            .collect();
        debug!("Segment edges: {:?}", edges);

        let assignments = personas
            .iter()
            .map(|(key, &mean)| {
                let rank = bin_index(&edges, mean);
                let segment = Segment {
                    rank,
                    label: self.labels[rank].clone(),
                };
                (key.clone(), segment)
            })
            .collect();

        Ok(Segmentation { edges, assignments })
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            labels: REFERENCE_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Type-7 quantile of an ascending, non-empty slice.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    if lo + 1 >= n {
        return sorted[n - 1];
    }
    sorted[lo] + (h - lo as f64) * (sorted[lo + 1] - sorted[lo])
}

/// Index of the right-closed bin holding `value`.
fn bin_index(edges: &[f64], value: f64) -> usize {
    let bins = edges.len() - 1;
    edges[1..]
        .iter()
        .position(|&upper| value <= upper)
        .unwrap_or(bins - 1)
}
