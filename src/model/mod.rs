//! Prediction Ensemble
//!
//! Regression ensemble that maps a nine-slot agronomic feature row to a
//! 0-100 health score and status.

pub mod boosting;
pub mod ensemble;
pub mod forest;
pub mod scaler;
pub mod service;
pub mod training;
pub mod tree;

pub use ensemble::{
    EnsembleModel, EnsembleWeights, FeatureImportance, FeatureVector, HealthEnsemble, HealthPredictor,
    HealthStatus, ModelInfo, Prediction, PredictionQuality, PredictionResult, RuleBasedPredictor,
    TrainingMetrics, ENSEMBLE_MODEL_TYPE, RULE_BASED_MODEL_TYPE,
};
pub use service::{PredictionMode, PredictionService};
pub use training::{health_score_rule, FEATURE_COUNT, FEATURE_NAMES};
