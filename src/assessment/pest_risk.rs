//! Pest Risk
//!
//! Three bounded factors combine into one weighted score:
//!
//! ```text
//! overall = 0.4·environmental + 0.35·spectral_stress + 0.25·seasonal
//! ```
//!
//! Specific pest risks scale `overall` by crop/pest multipliers conditioned on
//! the current temperature and humidity. Missing indices read as NDVI mean
//! 0.5, NDVI std 0.1 and NDWI mean 0.3.

use super::crop::CropType;
use crate::config::AnalysisConfig;
use crate::types::{Coordinates, IndexKind, IndexSet, Weather};
use chrono::Datelike;
use serde::Serialize;

const ENVIRONMENTAL_WEIGHT: f64 = 0.4;
const SPECTRAL_STRESS_WEIGHT: f64 = 0.35;
const SEASONAL_WEIGHT: f64 = 0.25;

const NEUTRAL_NDVI_MEAN: f64 = 0.5;
const NEUTRAL_NDVI_STD: f64 = 0.1;
const NEUTRAL_NDWI_MEAN: f64 = 0.3;

/// Categorised pest risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// ≥0.7 high, ≥0.4 medium, else low
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            RiskLevel::High
        } else if score >= 0.4 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// The three sub-scores, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskFactors {
    pub environmental: f64,
    pub spectral_stress: f64,
    pub seasonal: f64,
}

impl RiskFactors {
    pub fn overall(&self) -> f64 {
        let weighted = self.environmental * ENVIRONMENTAL_WEIGHT
            + self.spectral_stress * SPECTRAL_STRESS_WEIGHT
            + self.seasonal * SEASONAL_WEIGHT;
        weighted.min(1.0)
    }
}

/// Risk for one named pest
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PestRisk {
    pub pest: &'static str,
    pub risk: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnvironmentalConditions {
    pub temperature: f64,
    pub humidity: f64,
    pub favorable_for_pests: bool,
}

/// Complete pest-risk assessment for one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PestRiskAssessment {
    pub overall_risk: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: RiskFactors,
    /// Crop-specific pests in table order
    pub specific_pests: Vec<PestRisk>,
    pub environmental_conditions: EnvironmentalConditions,
    pub recommendations: Vec<String>,
}

impl PestRiskAssessment {
    pub fn pest_risk(&self, pest: &str) -> Option<f64> {
        self.specific_pests.iter().find(|p| p.pest == pest).map(|p| p.risk)
    }

    /// Pests with risk above `threshold`, in table order
    pub fn pests_above(&self, threshold: f64) -> impl Iterator<Item = &PestRisk> {
        self.specific_pests.iter().filter(move |p| p.risk > threshold)
    }
}

// ============================================================================
// Factors
// ============================================================================

/// Temperature band + humidity band + low-latitude bonus, capped at 1
pub fn environmental_risk(temperature: f64, humidity: f64, latitude: f64) -> f64 {
    let mut risk = 0.0;

    risk += if (22.0..=32.0).contains(&temperature) {
        0.3
    } else if temperature > 35.0 || temperature < 15.0 {
        0.1
    } else {
        0.2
    };

    risk += if humidity > 75.0 {
        0.4
    } else if humidity < 40.0 {
        0.3
    } else {
        0.2
    };

    if latitude.abs() < 35.0 {
        risk += 0.2;
    }

    f64::min(risk, 1.0)
}

/// Low vigour, uneven growth and water stress, capped at 1
pub fn spectral_stress(ndvi_mean: f64, ndvi_std: f64, ndwi_mean: f64) -> f64 {
    let mut stress = 0.0;

    if ndvi_mean < 0.4 {
        stress += 0.4;
    } else if ndvi_mean < 0.6 {
        stress += 0.2;
    }

    if ndvi_std > 0.15 {
        stress += 0.3;
    } else if ndvi_std > 0.10 {
        stress += 0.2;
    }

    if ndwi_mean < 0.2 {
        stress += 0.3;
    }

    f64::min(stress, 1.0)
}

/// Crop/month lookup with a 0.4 baseline
pub fn seasonal_risk(latitude: f64, crop: &CropType, month: u32) -> f64 {
    if latitude > 0.0 {
        match crop {
            CropType::Rice | CropType::Cotton if (6..=8).contains(&month) => return 0.8,
            CropType::Wheat if (3..=5).contains(&month) => return 0.6,
            _ => {}
        }
    } else if matches!(month, 12 | 1 | 2) {
        return 0.7;
    }
    0.4
}

/// Crop pest table, each entry a multiplier on `overall`
pub fn specific_pest_risks(overall: f64, crop: &CropType, temperature: f64, humidity: f64) -> Vec<PestRisk> {
    let pick = |condition: bool, hit: f64, miss: f64| if condition { hit } else { miss };

    let table: [(&'static str, f64); 4] = match crop {
        CropType::Rice => [
            ("brown_planthopper", pick(humidity > 80.0, 0.9, 0.6)),
            ("rice_blast", pick(humidity > 75.0 && temperature > 25.0, 0.8, 0.4)),
            ("stem_borer", 0.7),
            ("leaf_folder", pick(temperature > 28.0, 0.6, 0.4)),
        ],
        CropType::Cotton => [
            ("bollworm", pick(temperature > 25.0 && temperature < 35.0, 0.8, 0.5)),
            ("aphids", pick(humidity < 60.0, 0.7, 0.4)),
            ("whitefly", pick(temperature > 30.0, 0.9, 0.6)),
            ("thrips", 0.6),
        ],
        CropType::Wheat => [
            ("rust", pick(humidity > 70.0, 0.8, 0.3)),
            ("aphids", 0.7),
            ("termites", pick(humidity < 50.0, 0.5, 0.3)),
            ("army_worm", pick(temperature > 25.0, 0.6, 0.4)),
        ],
        _ => [
            ("aphids", 0.6),
            ("spider_mites", pick(humidity < 50.0, 0.5, 0.3)),
            ("thrips", 0.5),
            ("fungal_diseases", pick(humidity > 75.0, 0.7, 0.4)),
        ],
    };

    table
        .into_iter()
        .map(|(pest, multiplier)| PestRisk { pest, risk: overall * multiplier })
        .collect()
}

fn pest_recommendations(overall: f64, pests: &[PestRisk], crop: &CropType, limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    if overall > 0.7 {
        lines.extend([
            "Implement intensive field monitoring (2-3 times per week)".to_string(),
            "Consider preventive pest control measures".to_string(),
            "Monitor weather conditions for pest-favorable periods".to_string(),
        ]);
    } else if overall > 0.4 {
        lines.extend([
            "Regular field scouting (weekly)".to_string(),
            "Maintain field hygiene and remove crop residues".to_string(),
            "Monitor threshold levels for economic pests".to_string(),
        ]);
    }

    let risk_of = |name: &str| pests.iter().find(|p| p.pest == name).map_or(0.0, |p| p.risk);

    if *crop == CropType::Rice && risk_of("brown_planthopper") > 0.6 {
        lines.push("Monitor for brown planthopper, especially in humid conditions".to_string());
    }
    if *crop == CropType::Cotton && risk_of("bollworm") > 0.6 {
        lines.push("Check for bollworm eggs and larvae on cotton bolls".to_string());
    }

    for pest in pests.iter().filter(|p| p.risk > 0.7) {
        lines.push(format!("Monitor {} populations closely", pest.pest.replace('_', " ")));
    }

    lines.truncate(limit);
    lines
}

// ============================================================================
// Entry points
// ============================================================================

/// Assess pest risk for an explicit calendar month (1-12)
pub fn assess_pest_risk(
    indices: &IndexSet,
    weather: &Weather,
    coordinates: Coordinates,
    crop: &CropType,
    month: u32,
    config: &AnalysisConfig,
) -> PestRiskAssessment {
    let (ndvi_mean, ndvi_std) = match indices.get(IndexKind::Ndvi).filter(|a| !a.is_empty()) {
        Some(array) => {
            let n = array.len() as f64;
            let mean = array.values().iter().sum::<f64>() / n;
            let var = array.values().iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            (mean, var.sqrt())
        }
        None => (NEUTRAL_NDVI_MEAN, NEUTRAL_NDVI_STD),
    };
    let ndwi_mean = indices
        .get(IndexKind::Ndwi)
        .and_then(|a| a.mean())
        .unwrap_or(NEUTRAL_NDWI_MEAN);

    let factors = RiskFactors {
        environmental: environmental_risk(weather.temperature, weather.humidity, coordinates.lat),
        spectral_stress: spectral_stress(ndvi_mean, ndvi_std, ndwi_mean),
        seasonal: seasonal_risk(coordinates.lat, crop, month),
    };
    let overall = factors.overall();
    let risk_level = RiskLevel::from_score(overall);

    let specific_pests = specific_pest_risks(overall, crop, weather.temperature, weather.humidity);
    let recommendations = pest_recommendations(overall, &specific_pests, crop, config.max_pest_recommendations);

    tracing::info!(
        "Pest risk for {} at ({:.2}, {:.2}): {:.2} ({})",
        crop,
        coordinates.lat,
        coordinates.lon,
        overall,
        risk_level.as_str()
    );

    PestRiskAssessment {
        overall_risk: overall,
        risk_level,
        risk_factors: factors,
        specific_pests,
        environmental_conditions: EnvironmentalConditions {
            temperature: weather.temperature,
            humidity: weather.humidity,
            favorable_for_pests: weather.humidity > 70.0
                && weather.temperature > 20.0
                && weather.temperature < 35.0,
        },
        recommendations,
    }
}

/// Assess pest risk for the current UTC month
pub fn assess_pest_risk_now(
    indices: &IndexSet,
    weather: &Weather,
    coordinates: Coordinates,
    crop: &CropType,
    config: &AnalysisConfig,
) -> PestRiskAssessment {
    let month = chrono::Utc::now().month();
    assess_pest_risk(indices, weather, coordinates, crop, month, config)
}
