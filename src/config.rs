//! Analysis configuration
//!
//! Every constant used by the assessors and the prediction ensemble lives
//! here. `Default` reproduces the reference values, so a JSON file only has to
//! list the fields it overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Crop-specific NDVI thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropThreshold {
    /// NDVI above which a pixel can be rated excellent
    pub healthy_ndvi: f64,
    /// NDVI drop considered a stress signal
    pub stress_threshold: f64,
}

impl Default for CropThreshold {
    fn default() -> Self {
        Self {
            healthy_ndvi: 0.7,
            stress_threshold: 0.15,
        }
    }
}

/// Hyper-parameters of the two-member regression ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Synthetic training corpus size
    pub n_samples: usize,
    /// Fraction held out for test metrics
    pub test_fraction: f64,
    pub seed: u64,

    pub rf_trees: usize,
    pub rf_max_depth: usize,
    pub rf_min_samples_split: usize,
    pub rf_min_samples_leaf: usize,

    pub gb_trees: usize,
    pub gb_max_depth: usize,
    pub gb_learning_rate: f64,

    pub rf_weight: f64,
    pub gb_weight: f64,

    /// Quantile bins per feature used for split search
    pub max_bins: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            n_samples: 10_000,
            test_fraction: 0.2,
            seed: 42,
            rf_trees: 100,
            rf_max_depth: 10,
            rf_min_samples_split: 10,
            rf_min_samples_leaf: 5,
            gb_trees: 100,
            gb_max_depth: 6,
            gb_learning_rate: 0.1,
            rf_weight: 0.6,
            gb_weight: 0.4,
            max_bins: 64,
        }
    }
}

impl EnsembleConfig {
    /// Reduced corpus and tree counts for fast start-up (tests, demos)
    pub fn fast() -> Self {
        Self {
            n_samples: 2_000,
            rf_trees: 30,
            gb_trees: 60,
            ..Self::default()
        }
    }
}

/// Top-level configuration for the analysis core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Entries read from a file are merged over the built-in table
    #[serde(deserialize_with = "merge_crop_thresholds")]
    pub crop_thresholds: BTreeMap<String, CropThreshold>,
    pub ensemble: EnsembleConfig,
    pub max_recommendations: usize,
    pub max_pest_recommendations: usize,
}

fn default_crop_thresholds() -> BTreeMap<String, CropThreshold> {
    [
        ("rice", 0.8, 0.15),
        ("wheat", 0.7, 0.12),
        ("cotton", 0.75, 0.18),
        ("sugarcane", 0.85, 0.20),
        ("maize", 0.7, 0.15),
    ]
    .into_iter()
    .map(|(crop, healthy_ndvi, stress_threshold)| {
        (crop.to_string(), CropThreshold { healthy_ndvi, stress_threshold })
    })
    .collect()
}

fn merge_crop_thresholds<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, CropThreshold>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<String, CropThreshold>::deserialize(deserializer)?;
    let mut thresholds = default_crop_thresholds();
    thresholds.extend(overrides.into_iter().map(|(crop, t)| (crop.to_lowercase(), t)));
    Ok(thresholds)
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            crop_thresholds: default_crop_thresholds(),
            ensemble: EnsembleConfig::default(),
            max_recommendations: 5,
            max_pest_recommendations: 5,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: AnalysisConfig = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse config JSON")?;

        config.check()?;
        Ok(config)
    }

    /// Thresholds for a crop, falling back to the default entry
    pub fn crop_threshold(&self, crop: &str) -> CropThreshold {
        self.crop_thresholds
            .get(&crop.to_lowercase())
            .copied()
            .unwrap_or_default()
    }

    fn check(&self) -> Result<()> {
        let e = &self.ensemble;
        if e.n_samples < 10 {
            anyhow::bail!("ensemble.n_samples must be at least 10, got {}", e.n_samples);
        }
        if !(0.0..1.0).contains(&e.test_fraction) {
            anyhow::bail!("ensemble.test_fraction must be in [0, 1), got {}", e.test_fraction);
        }
        if e.max_bins < 2 || e.max_bins > 256 {
            anyhow::bail!("ensemble.max_bins must be in [2, 256], got {}", e.max_bins);
        }
        if e.rf_trees == 0 || e.gb_trees == 0 {
            anyhow::bail!("ensemble tree counts must be positive");
        }
        Ok(())
    }
}
