//! Report generation for persona tables.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report, write_report};

use crate::models::SegmentStats;
use crate::table::PersonaTable;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about the table a report describes.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Input the table was built from.
    pub source: String,
    pub generated_at: DateTime<Utc>,
    /// Records in the input batch.
    pub records: usize,
    /// Records dropped for an unbucketable age.
    pub dropped_records: usize,
    pub personas: usize,
    pub boundaries: Vec<i64>,
    pub quantile_edges: Vec<f64>,
}

/// One persona row of a report.
#[derive(Debug, Clone, Serialize)]
pub struct PersonaRow {
    pub key: String,
    pub mean_price: f64,
    pub count: usize,
    pub segment: String,
}

/// Everything a report renders.
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub metadata: ReportMetadata,
    pub segments: Vec<SegmentStats>,
    /// Empty when the listing is disabled.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub personas: Vec<PersonaRow>,
}

impl TableReport {
    pub fn from_table(
        table: &PersonaTable,
        source: impl Into<String>,
        records: usize,
        include_personas: bool,
    ) -> Self {
        let metadata = ReportMetadata {
            source: source.into(),
            generated_at: Utc::now(),
            records,
            dropped_records: table.dropped_records(),
            personas: table.len(),
            boundaries: table.buckets().boundaries().to_vec(),
            quantile_edges: table.quantile_edges().to_vec(),
        };

        let personas = if include_personas {
            table
                .entries()
                .map(|(key, entry)| PersonaRow {
                    key: key.to_string(),
                    mean_price: entry.mean_price,
                    count: entry.count,
                    segment: entry.segment.label.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            metadata,
            segments: table.segment_stats(),
            personas,
        }
    }
}
