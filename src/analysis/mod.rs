//! Analysis stages.
//!
//! Aggregation and segmentation build the persona table; `explore` holds
//! ad-hoc descriptive statistics that stay outside the pipeline.

pub mod aggregator;
pub mod explore;
pub mod segmenter;

pub use aggregator::{aggregate, Aggregate};
pub use explore::{compare_platforms, mann_whitney_u, BatchProfile, MannWhitney};
pub use segmenter::{Segmentation, Segmenter};
