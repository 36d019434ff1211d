//! Statistics Utilities
//!
//! Summary statistics over index arrays plus the NDVI helpers used around
//! prediction input: trend analysis over a history of field means, a data
//! quality check, and scalar NDVI resolution with an environmental estimate
//! as last resort.
//!
//! Percentiles use linear interpolation between closest ranks, so p50 equals
//! the median for every input length.

use crate::error::{Result, SpectralError};
use crate::indices;
use crate::types::IndexArray;
use serde::{Deserialize, Serialize};

// ============================================================================
// Index statistics
// ============================================================================

/// Read-only summary of one index array
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
}

impl IndexStatistics {
    /// Summarize raw values; fails on an empty slice
    pub fn compute(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(SpectralError::EmptyInput("index statistics"));
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let quantile = |q| percentile(&sorted, q).ok_or(SpectralError::EmptyInput("index statistics"));

        Ok(Self {
            mean,
            median: quantile(50.0)?,
            std: variance.sqrt(),
            min: quantile(0.0)?,
            max: quantile(100.0)?,
            count: values.len(),
            p25: quantile(25.0)?,
            p75: quantile(75.0)?,
            p90: quantile(90.0)?,
        })
    }

    /// Summarize an index array
    pub fn from_array(array: &IndexArray) -> Result<Self> {
        Self::compute(array.values())
    }
}

/// Percentile `q` (0-100) of a sorted slice, `None` when it is empty
///
/// Rank `q/100 · (n-1)`, interpolated between the bracketing elements.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    match sorted {
        [] => return None,
        [only] => return Some(*only),
        _ => {}
    }

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Some(sorted[lower] + fraction * (sorted[upper] - sorted[lower]))
}

// ============================================================================
// NDVI trend
// ============================================================================

/// Direction of an NDVI history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
    InsufficientData,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Stable => "stable",
            TrendDirection::Declining => "declining",
            TrendDirection::InsufficientData => "insufficient_data",
        }
    }

    /// Movement label reported next to the trend
    pub fn movement(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "increasing",
            TrendDirection::Stable => "no_change",
            TrendDirection::Declining => "decreasing",
            TrendDirection::InsufficientData => "unknown",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "Vegetation health is improving, maintain current practices",
            TrendDirection::Stable => "Vegetation health is stable, continue monitoring",
            TrendDirection::Declining => {
                "Consider investigating potential stressors (water, nutrients, pests)"
            }
            TrendDirection::InsufficientData => "Need more historical data for trend analysis",
        }
    }
}

/// Trend analysis over a chronological list of NDVI means
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NdviTrend {
    pub trend: TrendDirection,
    pub direction: &'static str,
    /// Least-squares slope per observation, 4 decimals
    pub slope: f64,
    /// Percent change from first to last observation, 2 decimals
    pub change_rate: f64,
    pub recommendation: &'static str,
    pub current_ndvi: Option<f64>,
    pub average_ndvi: Option<f64>,
}

const TREND_SLOPE_THRESHOLD: f64 = 0.01;

impl NdviTrend {
    pub fn analyze(history: &[f64]) -> Self {
        if history.len() < 2 {
            return Self::from_parts(TrendDirection::InsufficientData, 0.0, 0.0, None, None);
        }

        let slope = least_squares_slope(history);
        let trend = if slope.abs() < TREND_SLOPE_THRESHOLD {
            TrendDirection::Stable
        } else if slope > TREND_SLOPE_THRESHOLD {
            TrendDirection::Improving
        } else {
            TrendDirection::Declining
        };

        let first = history[0];
        let last = history[history.len() - 1];
        let change_rate = if first == 0.0 { 0.0 } else { (last - first) / first * 100.0 };
        let average = history.iter().sum::<f64>() / history.len() as f64;

        tracing::debug!("NDVI trend over {} points: {} (slope {:.4})", history.len(), trend.as_str(), slope);

        Self::from_parts(
            trend,
            round_to(slope, 4),
            round_to(change_rate, 2),
            Some(round_to(last, 3)),
            Some(round_to(average, 3)),
        )
    }

    fn from_parts(
        trend: TrendDirection,
        slope: f64,
        change_rate: f64,
        current_ndvi: Option<f64>,
        average_ndvi: Option<f64>,
    ) -> Self {
        Self {
            trend,
            direction: trend.movement(),
            slope,
            change_rate,
            recommendation: trend.recommendation(),
            current_ndvi,
            average_ndvi,
        }
    }
}

/// Slope of the degree-1 least-squares fit against positions 0..n
fn least_squares_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let (num, den) = values.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, &y)| {
        let dx = i as f64 - x_mean;
        (num + dx * (y - y_mean), den + dx * dx)
    });

    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ============================================================================
// NDVI validation
// ============================================================================

/// Reason an NDVI array was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssue {
    Empty,
    OutOfRange,
    NonFinite,
    MeanTooLow,
    NoVariation,
}

impl ValidationIssue {
    pub fn message(&self) -> &'static str {
        match self {
            ValidationIssue::Empty => "No NDVI data provided",
            ValidationIssue::OutOfRange => "NDVI values outside valid range [-1, 1]",
            ValidationIssue::NonFinite => "NDVI data contains invalid values (NaN or Inf)",
            ValidationIssue::MeanTooLow => "Mean NDVI too low, check data quality",
            ValidationIssue::NoVariation => "NDVI data shows no variation, possible data quality issue",
        }
    }
}

/// Verdict of [`validate_ndvi`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NdviValidation {
    pub valid: bool,
    pub issue: Option<ValidationIssue>,
}

impl NdviValidation {
    fn ok() -> Self {
        Self { valid: true, issue: None }
    }

    fn rejected(issue: ValidationIssue) -> Self {
        Self { valid: false, issue: Some(issue) }
    }

    pub fn message(&self) -> &'static str {
        self.issue.map(|i| i.message()).unwrap_or("NDVI data is valid")
    }
}

/// Quality check for raw NDVI values before they feed a report
pub fn validate_ndvi(values: &[f64]) -> NdviValidation {
    if values.is_empty() {
        return NdviValidation::rejected(ValidationIssue::Empty);
    }
    if values.iter().any(|v| !v.is_finite()) {
        return NdviValidation::rejected(ValidationIssue::NonFinite);
    }
    if values.iter().any(|v| *v < -1.0 || *v > 1.0) {
        return NdviValidation::rejected(ValidationIssue::OutOfRange);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean < -0.5 {
        return NdviValidation::rejected(ValidationIssue::MeanTooLow);
    }

    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std < 0.001 && values.len() > 10 {
        return NdviValidation::rejected(ValidationIssue::NoVariation);
    }

    NdviValidation::ok()
}

// ============================================================================
// Scalar NDVI resolution
// ============================================================================

/// Where a resolved NDVI scalar came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NdviSource {
    Measured,
    FromBands,
    Estimated,
}

/// Sensor readings offered for NDVI resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NdviInputs {
    pub ndvi: Vec<f64>,
    pub red: Vec<f64>,
    pub nir: Vec<f64>,
    pub temperature: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub humidity: Option<f64>,
    pub ph: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NdviResolution {
    pub value: f64,
    pub source: NdviSource,
}

/// Resolve one NDVI scalar for prediction input
///
/// Pre-computed values win, then red/nir bands, then the environmental
/// estimate.
pub fn resolve_ndvi(inputs: &NdviInputs) -> NdviResolution {
    if !inputs.ndvi.is_empty() {
        let value = inputs.ndvi.iter().sum::<f64>() / inputs.ndvi.len() as f64;
        tracing::info!("Using existing NDVI data, average: {:.3}", value);
        return NdviResolution { value, source: NdviSource::Measured };
    }

    if let Ok(array) = indices::ndvi(&inputs.red, &inputs.nir) {
        if let Some(value) = array.mean() {
            tracing::info!("Calculated NDVI from red/NIR bands, average: {:.3}", value);
            return NdviResolution { value, source: NdviSource::FromBands };
        }
    }

    let value = estimate_ndvi(inputs);
    tracing::info!("Estimated NDVI from environmental features: {:.3}", value);
    NdviResolution { value, source: NdviSource::Estimated }
}

/// Environmental NDVI estimate, baseline 0.5, clamped to [0, 1]
pub fn estimate_ndvi(inputs: &NdviInputs) -> f64 {
    let mut estimate = 0.5;

    if let Some(temp) = inputs.temperature {
        if (20.0..=30.0).contains(&temp) {
            estimate += 0.1;
        } else if temp < 10.0 || temp > 40.0 {
            estimate -= 0.2;
        } else if temp < 15.0 || temp > 35.0 {
            estimate -= 0.1;
        }
    }

    if let Some(moisture) = inputs.soil_moisture {
        if moisture > 60.0 {
            estimate += 0.15;
        } else if moisture > 40.0 {
            estimate += 0.05;
        } else if moisture < 20.0 {
            estimate -= 0.2;
        }
    }

    if let Some(humidity) = inputs.humidity {
        if (50.0..=70.0).contains(&humidity) {
            estimate += 0.05;
        } else if humidity < 30.0 {
            estimate -= 0.1;
        }
    }

    if let Some(ph) = inputs.ph {
        if (6.0..=7.5).contains(&ph) {
            estimate += 0.05;
        } else if ph < 5.5 || ph > 8.0 {
            estimate -= 0.1;
        }
    }

    f64::clamp(estimate, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_statistics_basic() {
        let stats = IndexStatistics::compute(&[0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_relative_eq!(stats.mean, 0.25, epsilon = 1e-12);
        assert_relative_eq!(stats.median, 0.25, epsilon = 1e-12);
        assert_relative_eq!(stats.min, 0.1);
        assert_relative_eq!(stats.max, 0.4);
        assert_eq!(stats.count, 4);
        // Population std of 0.1..0.4
        assert_relative_eq!(stats.std, 0.0125f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stats.p25, 0.175, epsilon = 1e-12);
        assert_relative_eq!(stats.p75, 0.325, epsilon = 1e-12);
        assert_relative_eq!(stats.p90, 0.37, epsilon = 1e-12);
    }

    #[test]
    fn test_statistics_single_value() {
        let stats = IndexStatistics::compute(&[0.42]).unwrap();
        assert_relative_eq!(stats.p90, 0.42);
        assert_relative_eq!(stats.std, 0.0);
    }

    #[test]
    fn test_statistics_empty_input() {
        let err = IndexStatistics::compute(&[]).unwrap_err();
        assert_eq!(err.kind(), "empty_input");
    }

    #[test]
    fn test_percentile_edges() {
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(percentile(&[0.4], 90.0), Some(0.4));
        assert_relative_eq!(percentile(&[0.0, 1.0], 25.0).unwrap(), 0.25, epsilon = 1e-12);
        assert_eq!(percentile(&[0.1, 0.5, 0.9], 0.0), Some(0.1));
        assert_eq!(percentile(&[0.1, 0.5, 0.9], 100.0), Some(0.9));
    }

    #[test]
    fn test_statistics_idempotent() {
        let array = IndexArray::new(vec![0.8, -0.2, 0.5, 0.1, 0.9]);
        let a = IndexStatistics::from_array(&array).unwrap();
        let b = IndexStatistics::from_array(&array).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_trend_directions() {
        let improving = NdviTrend::analyze(&[0.4, 0.5, 0.6, 0.7]);
        assert_eq!(improving.trend, TrendDirection::Improving);
        assert_eq!(improving.direction, "increasing");
        assert_relative_eq!(improving.slope, 0.1, epsilon = 1e-9);
        assert_relative_eq!(improving.change_rate, 75.0, epsilon = 1e-9);
        assert_eq!(improving.current_ndvi, Some(0.7));

        let declining = NdviTrend::analyze(&[0.8, 0.6, 0.4]);
        assert_eq!(declining.trend, TrendDirection::Declining);

        let stable = NdviTrend::analyze(&[0.5, 0.505, 0.5]);
        assert_eq!(stable.trend, TrendDirection::Stable);
        assert_eq!(stable.direction, "no_change");
    }

    #[test]
    fn test_trend_insufficient_and_zero_start() {
        let single = NdviTrend::analyze(&[0.5]);
        assert_eq!(single.trend, TrendDirection::InsufficientData);
        assert_eq!(single.current_ndvi, None);

        let from_zero = NdviTrend::analyze(&[0.0, 0.5]);
        assert_relative_eq!(from_zero.change_rate, 0.0);
    }

    #[test]
    fn test_validate_ndvi() {
        assert!(validate_ndvi(&[0.2, 0.5, 0.7]).valid);
        assert_eq!(validate_ndvi(&[]).issue, Some(ValidationIssue::Empty));
        assert_eq!(validate_ndvi(&[0.2, 1.5]).issue, Some(ValidationIssue::OutOfRange));
        assert_eq!(validate_ndvi(&[0.2, f64::NAN]).issue, Some(ValidationIssue::NonFinite));
        assert_eq!(validate_ndvi(&[-0.9, -0.8]).issue, Some(ValidationIssue::MeanTooLow));
        assert_eq!(validate_ndvi(&[0.5; 11]).issue, Some(ValidationIssue::NoVariation));
        // Ten identical values are still accepted
        assert!(validate_ndvi(&[0.5; 10]).valid);
    }

    #[test]
    fn test_resolve_ndvi_precedence() {
        let measured = NdviInputs {
            ndvi: vec![0.6, 0.8],
            red: vec![0.1],
            nir: vec![0.5],
            ..Default::default()
        };
        let r = resolve_ndvi(&measured);
        assert_eq!(r.source, NdviSource::Measured);
        assert_relative_eq!(r.value, 0.7, epsilon = 1e-12);

        let bands = NdviInputs { red: vec![0.05], nir: vec![0.65], ..Default::default() };
        let r = resolve_ndvi(&bands);
        assert_eq!(r.source, NdviSource::FromBands);
        assert_relative_eq!(r.value, 0.6 / 0.7, epsilon = 1e-12);

        let r = resolve_ndvi(&NdviInputs::default());
        assert_eq!(r.source, NdviSource::Estimated);
        assert_relative_eq!(r.value, 0.5);
    }

    #[test]
    fn test_estimate_ndvi_adjustments() {
        let good = NdviInputs {
            temperature: Some(25.0),
            soil_moisture: Some(65.0),
            humidity: Some(60.0),
            ph: Some(6.5),
            ..Default::default()
        };
        assert_relative_eq!(estimate_ndvi(&good), 0.85, epsilon = 1e-12);

        let harsh = NdviInputs {
            temperature: Some(45.0),
            soil_moisture: Some(10.0),
            humidity: Some(20.0),
            ph: Some(9.0),
            ..Default::default()
        };
        assert_relative_eq!(estimate_ndvi(&harsh), 0.0);
    }
}
