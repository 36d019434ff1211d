//! Health-Score Ensemble
//!
//! A bagged forest and a boosted tree sequence are fitted on the synthetic
//! corpus over standardised features and blended with fixed weights.
//!
//! Score to status cut points:
//!
//! | score | status | confidence |
//! |---|---|---|
//! | >= 80 | Excellent | 95 |
//! | >= 70 | Good | 90 |
//! | >= 50 | Moderate | 85 |
//! | >= 30 | Poor | 80 |
//! | < 30 | Critical | 75 |

use super::boosting::GradientBoosting;
use super::forest::RandomForest;
use super::scaler::StandardScaler;
use super::training::{
    generate_corpus, health_score_rule, r2_score, rmse, train_test_split, FEATURE_COUNT, FEATURE_NAMES,
};
use super::tree::{BinMapper, TreeParams};
use crate::config::EnsembleConfig;
use crate::error::{Result, SpectralError};
use crate::utils::statistics::round_to;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

pub const ENSEMBLE_MODEL_TYPE: &str = "Agricultural Ensemble (RandomForest + GradientBoosting)";
pub const RULE_BASED_MODEL_TYPE: &str = "Rule-Based Fallback";

/// Value used for slots missing from a short input row
const PAD_VALUE: f64 = 0.5;
const HIGH_QUALITY_CONFIDENCE: f64 = 85.0;

// ============================================================================
// Inputs and outputs
// ============================================================================

/// One input row normalised to exactly nine slots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>")]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Pad with 0.5 or truncate to nine slots; non-finite values read as 0.5
    pub fn from_slice(values: &[f64]) -> Self {
        let mut slots = [PAD_VALUE; FEATURE_COUNT];
        for (slot, v) in slots.iter_mut().zip(values) {
            if v.is_finite() {
                *slot = *v;
            }
        }
        Self(slots)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn ndvi(&self) -> f64 {
        self.0[0]
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self::from_slice(&values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    Excellent,
    Good,
    Moderate,
    Poor,
    Critical,
}

impl HealthStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            HealthStatus::Excellent
        } else if score >= 70.0 {
            HealthStatus::Good
        } else if score >= 50.0 {
            HealthStatus::Moderate
        } else if score >= 30.0 {
            HealthStatus::Poor
        } else {
            HealthStatus::Critical
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            HealthStatus::Excellent => 95.0,
            HealthStatus::Good => 90.0,
            HealthStatus::Moderate => 85.0,
            HealthStatus::Poor => 80.0,
            HealthStatus::Critical => 75.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "Excellent",
            HealthStatus::Good => "Good",
            HealthStatus::Moderate => "Moderate",
            HealthStatus::Poor => "Poor",
            HealthStatus::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PredictionQuality {
    High,
    Medium,
}

impl PredictionQuality {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > HIGH_QUALITY_CONFIDENCE {
            PredictionQuality::High
        } else {
            PredictionQuality::Medium
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// 2 decimals
    pub health_score: f64,
    pub status: HealthStatus,
    pub confidence: f64,
    /// Slot 0 of the normalised row, 3 decimals
    pub ndvi_value: f64,
    pub prediction_quality: PredictionQuality,
    pub model_type: &'static str,
}

impl PredictionResult {
    fn from_score(score: f64, features: &FeatureVector, model_type: &'static str) -> Self {
        let status = HealthStatus::from_score(score);
        let confidence = status.confidence();
        Self {
            health_score: round_to(score, 2),
            status,
            confidence,
            ndvi_value: round_to(features.ndvi(), 3),
            prediction_quality: PredictionQuality::from_confidence(confidence),
            model_type,
        }
    }
}

/// One result for a single input row, a list otherwise
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Single(PredictionResult),
    Batch(Vec<PredictionResult>),
}

impl Prediction {
    fn from_results(mut results: Vec<PredictionResult>) -> Self {
        if results.len() == 1 {
            if let Some(only) = results.pop() {
                return Prediction::Single(only);
            }
        }
        Prediction::Batch(results)
    }

    pub fn results(&self) -> &[PredictionResult] {
        match self {
            Prediction::Single(result) => std::slice::from_ref(result),
            Prediction::Batch(results) => results,
        }
    }
}

/// Anything that maps feature rows to health predictions
pub trait HealthPredictor {
    fn predict_score(&self, features: &FeatureVector) -> f64;

    fn model_type(&self) -> &'static str;

    /// Predict every row; fails on an empty batch
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Prediction> {
        if rows.is_empty() {
            return Err(SpectralError::EmptyInput("feature rows"));
        }
        let results: Vec<PredictionResult> = rows
            .iter()
            .map(|row| {
                let features = FeatureVector::from_slice(row);
                PredictionResult::from_score(self.predict_score(&features), &features, self.model_type())
            })
            .collect();
        debug!("Predicted {} rows with {}", results.len(), self.model_type());
        Ok(Prediction::from_results(results))
    }
}

// ============================================================================
// Metrics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: &'static str,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingMetrics {
    pub train_r2: f64,
    pub test_r2: f64,
    pub train_rmse: f64,
    pub test_rmse: f64,
    /// Sorted by importance, descending
    pub feature_importance: Vec<FeatureImportance>,
    pub n_features: usize,
    pub n_samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnsembleWeights {
    pub rf: f64,
    pub gb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub status: &'static str,
    pub model_type: &'static str,
    pub weights: Option<EnsembleWeights>,
    pub metrics: Option<TrainingMetrics>,
}

// ============================================================================
// Trained ensemble
// ============================================================================

#[derive(Debug, Clone)]
pub struct HealthEnsemble {
    scaler: StandardScaler,
    forest: RandomForest,
    boosting: GradientBoosting,
    weights: EnsembleWeights,
    metrics: TrainingMetrics,
}

impl HealthEnsemble {
    /// Generate the corpus, fit both members in parallel and score them
    pub fn train(config: &EnsembleConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Training health ensemble on {} synthetic samples", config.n_samples);

        let corpus = generate_corpus(config.n_samples, config.seed)?;
        let n_samples = corpus.len();
        let split = train_test_split(corpus, config.test_fraction, config.seed);
        if split.train.is_empty() {
            return Err(SpectralError::EmptyInput("training corpus"));
        }

        let scaler = StandardScaler::fit(&split.train.features, FEATURE_COUNT);
        let train_x = scaler.transform(&split.train.features);
        let test_x = scaler.transform(&split.test.features);

        let mapper = BinMapper::fit(&train_x, FEATURE_COUNT, config.max_bins);
        let binned = mapper.transform(&train_x);
        let targets = &split.train.targets;

        let rf_params = TreeParams {
            max_depth: config.rf_max_depth,
            min_samples_split: config.rf_min_samples_split,
            min_samples_leaf: config.rf_min_samples_leaf,
        };
        let gb_params = TreeParams {
            max_depth: config.gb_max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
        };

        let (forest, boosting) = rayon::join(
            || RandomForest::fit(&binned, &mapper, targets, config.rf_trees, rf_params, config.seed),
            || GradientBoosting::fit(&binned, &mapper, targets, config.gb_trees, config.gb_learning_rate, gb_params),
        );

        let weights = EnsembleWeights { rf: config.rf_weight, gb: config.gb_weight };
        let blend = |row: &[f64]| weights.rf * forest.predict(row) + weights.gb * boosting.predict(row);
        let train_pred: Vec<f64> = train_x.iter().map(|r| blend(r)).collect();
        let test_pred: Vec<f64> = test_x.iter().map(|r| blend(r)).collect();

        let mut feature_importance: Vec<FeatureImportance> = FEATURE_NAMES
            .iter()
            .zip(forest.feature_importances())
            .map(|(feature, importance)| FeatureImportance { feature: *feature, importance: *importance })
            .collect();
        feature_importance.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        let metrics = TrainingMetrics {
            train_r2: round_to(r2_score(targets, &train_pred), 4),
            test_r2: round_to(r2_score(&split.test.targets, &test_pred), 4),
            train_rmse: round_to(rmse(targets, &train_pred), 2),
            test_rmse: round_to(rmse(&split.test.targets, &test_pred), 2),
            feature_importance,
            n_features: FEATURE_COUNT,
            n_samples,
        };

        info!(
            "Ensemble trained in {:.2}s: test R2 {:.4}, test RMSE {:.2}",
            start.elapsed().as_secs_f64(),
            metrics.test_r2,
            metrics.test_rmse
        );

        Ok(Self { scaler, forest, boosting, weights, metrics })
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn weights(&self) -> EnsembleWeights {
        self.weights
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            status: "trained",
            model_type: ENSEMBLE_MODEL_TYPE,
            weights: Some(self.weights),
            metrics: Some(self.metrics.clone()),
        }
    }
}

impl HealthPredictor for HealthEnsemble {
    fn predict_score(&self, features: &FeatureVector) -> f64 {
        let row = self.scaler.transform_row(features.as_slice());
        self.weights.rf * self.forest.predict(&row) + self.weights.gb * self.boosting.predict(&row)
    }

    fn model_type(&self) -> &'static str {
        ENSEMBLE_MODEL_TYPE
    }
}

/// Untrained → Trained, one way
#[derive(Debug, Clone, Default)]
pub enum EnsembleModel {
    #[default]
    Untrained,
    Trained(Box<HealthEnsemble>),
}

impl EnsembleModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Train once; a trained model keeps its fit
    pub fn train(&mut self, config: &EnsembleConfig) -> Result<&TrainingMetrics> {
        if let EnsembleModel::Untrained = self {
            *self = EnsembleModel::Trained(Box::new(HealthEnsemble::train(config)?));
        }
        match self {
            EnsembleModel::Trained(ensemble) => Ok(ensemble.metrics()),
            EnsembleModel::Untrained => Err(SpectralError::ModelNotTrained),
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self, EnsembleModel::Trained(_))
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Prediction> {
        match self {
            EnsembleModel::Trained(ensemble) => ensemble.predict(rows),
            EnsembleModel::Untrained => Err(SpectralError::ModelNotTrained),
        }
    }

    pub fn info(&self) -> ModelInfo {
        match self {
            EnsembleModel::Trained(ensemble) => ensemble.info(),
            EnsembleModel::Untrained => ModelInfo {
                status: "not_trained",
                model_type: ENSEMBLE_MODEL_TYPE,
                weights: None,
                metrics: None,
            },
        }
    }
}

// ============================================================================
// Rule-based fallback
// ============================================================================

/// Noise-free scoring rule clamped to [0, 100]
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedPredictor;

impl HealthPredictor for RuleBasedPredictor {
    fn predict_score(&self, features: &FeatureVector) -> f64 {
        health_score_rule(features.as_slice()).clamp(0.0, 100.0)
    }

    fn model_type(&self) -> &'static str {
        RULE_BASED_MODEL_TYPE
    }
}
