//! Markdown and JSON report generation.
//!
//! This module renders a [`TableReport`] as a human-readable Markdown
//! document or as pretty-printed JSON.

use super::{ReportMetadata, TableReport};
use crate::config::ReportFormat;
use crate::models::SegmentStats;
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &TableReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Persona Revenue Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_segments_section(&report.segments));

    if !report.personas.is_empty() {
        output.push_str(&generate_personas_section(report));
    }

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Records:** {}\n", metadata.records));
    if metadata.dropped_records > 0 {
        section.push_str(&format!(
            "- **Dropped (age out of range):** {}\n",
            metadata.dropped_records
        ));
    }
    section.push_str(&format!("- **Personas:** {}\n", metadata.personas));
    section.push_str(&format!(
        "- **Age Boundaries:** {}\n",
        join(metadata.boundaries.iter().map(|b| b.to_string()))
    ));
    section.push_str(&format!(
        "- **Quantile Edges:** {}\n",
        join(metadata.quantile_edges.iter().map(|e| format!("{:.2}", e)))
    ));
    section.push('\n');

    section
}

/// Generate the segment statistics table, highest segment first.
fn generate_segments_section(segments: &[SegmentStats]) -> String {
    let mut section = String::new();

    section.push_str("## Segments\n\n");
    section.push_str("| Segment | Personas | Customers | Mean | Min | Max | Sum |\n");
    section.push_str("|:---:|:---:|:---:|---:|---:|---:|---:|\n");

    for stats in segments.iter().rev() {
        section.push_str(&format!(
            "| {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
            stats.segment.label,
            stats.personas,
            stats.records,
            stats.mean,
            stats.min,
            stats.max,
            stats.sum
        ));
    }
    section.push('\n');

    section
}

/// Generate the persona listing.
fn generate_personas_section(report: &TableReport) -> String {
    let mut section = String::new();

    section.push_str("## Personas\n\n");
    section.push_str("| Persona | Segment | Expected Revenue | Customers |\n");
    section.push_str("|:---|:---:|---:|---:|\n");

    for row in &report.personas {
        section.push_str(&format!(
            "| `{}` | {} | {:.2} | {} |\n",
            row.key, row.segment, row.mean_price, row.count
        ));
    }
    section.push('\n');

    section
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &TableReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render the report in `format` and write it to `path`.
pub fn write_report(report: &TableReport, format: ReportFormat, path: &Path) -> Result<()> {
    let content = match format {
        ReportFormat::Markdown => generate_markdown_report(report),
        ReportFormat::Json => generate_json_report(report)?,
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
