//! Utility modules shared across the analysis pipeline
//!
//! - Statistics: per-index summaries, NDVI trend and quality checks

pub mod statistics;

pub use statistics::{
    estimate_ndvi, resolve_ndvi, validate_ndvi, IndexStatistics, NdviInputs, NdviResolution,
    NdviSource, NdviTrend, NdviValidation, TrendDirection, ValidationIssue,
};
