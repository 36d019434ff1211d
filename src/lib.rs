//! Crop spectral analysis core
//!
//! Turns multi-spectral reflectance samples into crop-health insight:
//! - `indices`: normalized-difference indices (NDVI, NDWI, MNDWI, NDSI, RE-NDVI)
//! - `utils/`: per-index statistics, NDVI trends and quality checks
//! - `interpretation`: qualitative status bands for index means
//! - `land_cover`: per-pixel land-cover classification
//! - `assessment/`: health zones, pest risk and field recommendations
//! - `model/`: regression ensemble mapping agronomic features to a health score
//! - `analyzer`: end-to-end spectral report and field assessment
//!
//! Data sources, persistence and rendering sit behind the traits in
//! `sources`, `repository` and `visualization`.

pub mod error;
pub mod config;
pub mod types;
pub mod indices;
pub mod utils;
pub mod interpretation;
pub mod land_cover;
pub mod assessment;
pub mod model;
pub mod analyzer;
pub mod sources;
pub mod repository;
pub mod visualization;

// Re-export commonly used types
pub use error::{Result, SpectralError};
pub use config::{AnalysisConfig, CropThreshold, EnsembleConfig};
pub use types::{Band, Coordinates, DataProvenance, FieldData, IndexArray, IndexKind, IndexSet, SpectralSample, Weather};
pub use indices::{compute_all, compute_all_with_ndvi};
pub use utils::{IndexStatistics, NdviTrend};
pub use interpretation::{interpret, Interpretation, InterpretationStatus};
pub use land_cover::{classify_pixel, LandCover, LandCoverSummary};
pub use assessment::{CropType, HealthZoneReport, PestRiskAssessment, RiskLevel};
pub use model::{FeatureVector, HealthPredictor, HealthStatus, Prediction, PredictionMode, PredictionResult, PredictionService};
pub use analyzer::{FieldAnalyzer, FieldAssessment, SpectralReport};
