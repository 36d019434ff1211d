//! Prediction service handle
//!
//! Owns the lazily trained ensemble. The first prediction trains it; callers
//! arriving during training block on the same `OnceLock` and then share the
//! fitted model. A failed training run is cached too, so it is reported to
//! every caller instead of being retried.

use super::ensemble::{HealthEnsemble, HealthPredictor, ModelInfo, Prediction, RuleBasedPredictor, RULE_BASED_MODEL_TYPE};
use crate::config::EnsembleConfig;
use crate::error::{Result, SpectralError};
use std::sync::OnceLock;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictionMode {
    /// Train the ensemble on first use
    #[default]
    Ensemble,
    /// Never train; score with the closed-form rule
    RuleBased,
}

#[derive(Debug)]
pub struct PredictionService {
    mode: PredictionMode,
    config: EnsembleConfig,
    model: OnceLock<std::result::Result<HealthEnsemble, SpectralError>>,
}

impl PredictionService {
    pub fn new(config: EnsembleConfig) -> Self {
        Self::with_mode(config, PredictionMode::Ensemble)
    }

    pub fn with_mode(config: EnsembleConfig, mode: PredictionMode) -> Self {
        Self { mode, config, model: OnceLock::new() }
    }

    pub fn mode(&self) -> PredictionMode {
        self.mode
    }

    /// Trained ensemble, training it on first call
    pub fn ensemble(&self) -> Result<&HealthEnsemble> {
        self.model
            .get_or_init(|| {
                info!("Initializing health ensemble");
                HealthEnsemble::train(&self.config)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Prediction> {
        match self.mode {
            PredictionMode::Ensemble => self.ensemble()?.predict(rows),
            PredictionMode::RuleBased => RuleBasedPredictor.predict(rows),
        }
    }

    pub fn predict_one(&self, row: &[f64]) -> Result<Prediction> {
        self.predict(&[row.to_vec()])
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.model.get(), Some(Ok(_)))
    }

    /// Describe the model without triggering training
    pub fn model_info(&self) -> ModelInfo {
        match (self.mode, self.model.get()) {
            (PredictionMode::RuleBased, _) => ModelInfo {
                status: "rule_based",
                model_type: RULE_BASED_MODEL_TYPE,
                weights: None,
                metrics: None,
            },
            (PredictionMode::Ensemble, Some(Ok(ensemble))) => ensemble.info(),
            (PredictionMode::Ensemble, Some(Err(_))) => ModelInfo {
                status: "failed",
                ..super::ensemble::EnsembleModel::Untrained.info()
            },
            (PredictionMode::Ensemble, None) => super::ensemble::EnsembleModel::Untrained.info(),
        }
    }
}

impl Default for PredictionService {
    fn default() -> Self {
        Self::new(EnsembleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ensemble::HealthStatus;
    use std::sync::Arc;

    fn quick() -> EnsembleConfig {
        EnsembleConfig { n_samples: 400, rf_trees: 5, gb_trees: 10, ..EnsembleConfig::default() }
    }

    #[test]
    fn test_rule_based_mode_never_trains() {
        let service = PredictionService::with_mode(quick(), PredictionMode::RuleBased);
        let prediction = service.predict_one(&[0.75, 25.0, 60.0, 45.0, 6.8, 20.0, 22.0, 150.0, 40.0]).unwrap();
        assert_eq!(prediction.results()[0].status, HealthStatus::Excellent);
        assert!(!service.is_trained());
        assert_eq!(service.model_info().model_type, RULE_BASED_MODEL_TYPE);
    }

    #[test]
    fn test_lazy_training_shared_across_threads() {
        let service = Arc::new(PredictionService::new(quick()));
        assert_eq!(service.model_info().status, "not_trained");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || service.ensemble().map(|e| e as *const HealthEnsemble as usize))
            })
            .collect();
        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();

        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
        assert!(service.is_trained());
        assert_eq!(service.model_info().status, "trained");
    }

    #[test]
    fn test_training_failure_is_reported() {
        let config = EnsembleConfig { n_samples: 0, ..quick() };
        let service = PredictionService::new(config);
        assert_eq!(service.predict_one(&[0.5]).unwrap_err(), SpectralError::EmptyInput("training corpus"));
        assert_eq!(service.model_info().status, "failed");
    }
}
