//! Synthetic training corpus
//!
//! The ensemble is fitted on samples drawn from agronomic distributions and
//! scored by a closed-form rule. The same rule, without noise, backs the
//! rule-based fallback predictor.
//!
//! Feature slots:
//! `[ndvi, temperature, humidity, soil_moisture, ph, precipitation,
//!   solar_radiation, day_of_year, latitude]`

use crate::error::{Result, SpectralError};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Beta, Exp, Gamma, Normal};

pub const FEATURE_COUNT: usize = 9;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "ndvi",
    "temperature",
    "humidity",
    "soil_moisture",
    "ph",
    "precipitation",
    "solar_radiation",
    "day_of_year",
    "latitude",
];

const BASE_SCORE: f64 = 50.0;
const NOISE_STD: f64 = 5.0;

// ============================================================================
// Scoring rule
// ============================================================================

/// Health score of one feature row before noise and clamping
pub fn health_score_rule(row: &[f64]) -> f64 {
    let feature = |i: usize| row.get(i).copied().unwrap_or(0.5);
    let ndvi = feature(0);
    let temperature = feature(1);
    let humidity = feature(2);
    let soil_moisture = feature(3);
    let ph = feature(4);
    let precipitation = feature(5);
    let day_of_year = feature(7);
    let latitude = feature(8);

    let mut score = BASE_SCORE;

    score += if ndvi > 0.7 {
        35.0 * (ndvi - 0.7) / 0.3
    } else if ndvi < 0.3 {
        -30.0 * (0.3 - ndvi) / 0.3
    } else {
        10.0 * (ndvi - 0.3) / 0.4
    };

    score += if (18.0..=28.0).contains(&temperature) {
        15.0
    } else if !(10.0..=35.0).contains(&temperature) {
        -25.0
    } else {
        -1.5 * (temperature - 18.0).abs().min((temperature - 28.0).abs())
    };

    score += if (35.0..=65.0).contains(&soil_moisture) {
        12.0
    } else if soil_moisture < 20.0 {
        -20.0
    } else if soil_moisture > 80.0 {
        -15.0
    } else {
        5.0
    };

    if (6.0..=7.5).contains(&ph) {
        score += 8.0;
    } else if !(5.0..=8.5).contains(&ph) {
        score -= 15.0;
    }

    score += if humidity > 85.0 {
        -12.0
    } else if humidity < 40.0 {
        -8.0
    } else {
        3.0
    };

    if (10.0..=30.0).contains(&precipitation) {
        score += 5.0;
    } else if precipitation < 5.0 {
        score -= 8.0;
    } else if precipitation > 50.0 {
        score -= 6.0;
    }

    let growing_season = if latitude > 0.0 {
        (90.0..=270.0).contains(&day_of_year)
    } else {
        day_of_year <= 90.0 || day_of_year >= 270.0
    };
    if growing_season {
        score += 3.0;
    }

    score
}

// ============================================================================
// Corpus generation
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingCorpus {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl TrainingCorpus {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

fn config_error(e: impl std::fmt::Display) -> SpectralError {
    SpectralError::Config(e.to_string())
}

/// Draw `n` labelled rows; identical seeds give identical corpora
pub fn generate_corpus(n: usize, seed: u64) -> Result<TrainingCorpus> {
    let mut rng = StdRng::seed_from_u64(seed);

    let ndvi = Beta::<f64>::new(3.0, 1.5).map_err(config_error)?;
    let temperature = Normal::<f64>::new(22.0, 8.0).map_err(config_error)?;
    let humidity = Gamma::<f64>::new(2.0, 30.0).map_err(config_error)?;
    let soil_moisture = Normal::<f64>::new(45.0, 15.0).map_err(config_error)?;
    let ph = Normal::<f64>::new(6.5, 1.2).map_err(config_error)?;
    let precipitation = Exp::<f64>::new(1.0 / 15.0).map_err(config_error)?;
    let solar = Normal::<f64>::new(20.0, 5.0).map_err(config_error)?;
    let day = Uniform::<f64>::new(1.0, 365.0);
    let latitude = Uniform::<f64>::new(-60.0, 70.0);
    let noise = Normal::<f64>::new(0.0, NOISE_STD).map_err(config_error)?;

    let mut features = Vec::with_capacity(n);
    let mut targets = Vec::with_capacity(n);
    for _ in 0..n {
        let row = vec![
            ndvi.sample(&mut rng),
            temperature.sample(&mut rng).clamp(5.0, 40.0),
            humidity.sample(&mut rng).clamp(20.0, 95.0),
            soil_moisture.sample(&mut rng).clamp(10.0, 80.0),
            ph.sample(&mut rng).clamp(4.0, 9.0),
            precipitation.sample(&mut rng).clamp(0.0, 100.0),
            solar.sample(&mut rng).clamp(5.0, 35.0),
            day.sample(&mut rng),
            latitude.sample(&mut rng),
        ];
        let score = (health_score_rule(&row) + noise.sample(&mut rng)).clamp(0.0, 100.0);
        features.push(row);
        targets.push(score);
    }

    Ok(TrainingCorpus { features, targets })
}

/// Shuffled train/test partition
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: TrainingCorpus,
    pub test: TrainingCorpus,
}

pub fn train_test_split(corpus: TrainingCorpus, test_fraction: f64, seed: u64) -> TrainTestSplit {
    let n = corpus.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let n_test = ((n as f64) * test_fraction.clamp(0.0, 1.0)).round() as usize;
    let (test_idx, train_idx) = order.split_at(n_test.min(n));

    let pick = |idx: &[usize]| TrainingCorpus {
        features: idx.iter().map(|&i| corpus.features[i].clone()).collect(),
        targets: idx.iter().map(|&i| corpus.targets[i]).collect(),
    };

    TrainTestSplit { train: pick(train_idx), test: pick(test_idx) }
}

// ============================================================================
// Metrics
// ============================================================================

/// Coefficient of determination; 0 when the targets have no variance
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = actual.iter().zip(predicted).map(|(y, p)| (y - p).powi(2)).sum();
    if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    }
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mse = actual.iter().zip(predicted).map(|(y, p)| (y - p).powi(2)).sum::<f64>() / actual.len() as f64;
    mse.sqrt()
}
