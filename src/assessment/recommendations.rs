//! Field Recommendations
//!
//! Turns a health-zone report and a pest assessment into a short ordered list
//! of actionable items. Rules fire in a fixed order (crop health, pest level,
//! named pests, soil health) and the list is capped.

use super::crop::CropType;
use super::health_zones::HealthZoneReport;
use super::pest_risk::{PestRiskAssessment, RiskLevel};
use serde::Serialize;

const HIGH_RISK_PEST: f64 = 0.7;
const NAMED_PEST_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    CropHealth,
    PestControl,
    SpecificPests,
    SoilHealth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub actions: Vec<String>,
}

impl Recommendation {
    fn new(
        kind: RecommendationKind,
        priority: Priority,
        title: impl Into<String>,
        description: impl Into<String>,
        actions: &[&str],
    ) -> Self {
        Self {
            kind,
            priority,
            title: title.into(),
            description: description.into(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }
}

pub fn generate_recommendations(
    zones: &HealthZoneReport,
    pests: &PestRiskAssessment,
    crop: &CropType,
    limit: usize,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    let crop_score = zones.crop_health.overall_score;
    if crop_score < 0.4 {
        out.push(Recommendation::new(
            RecommendationKind::CropHealth,
            Priority::High,
            "Crop Health Critical",
            "Crop health is below optimal levels. Consider soil testing and nutrient management.",
            &["Soil nutrient analysis", "Fertilizer application", "Irrigation assessment"],
        ));
    } else if crop_score < 0.6 {
        out.push(Recommendation::new(
            RecommendationKind::CropHealth,
            Priority::Medium,
            "Improve Crop Health",
            "Moderate crop stress detected. Monitor and optimize growing conditions.",
            &["Monitor water stress", "Adjust fertilization", "Check for early pest signs"],
        ));
    }

    if pests.risk_level == RiskLevel::High {
        out.push(Recommendation::new(
            RecommendationKind::PestControl,
            Priority::High,
            "High Pest Risk Detected",
            "Environmental conditions favor pest development. Implement preventive measures.",
            &["Scout fields regularly", "Consider preventive treatments", "Monitor weather conditions"],
        ));
    }

    let named: Vec<&str> = pests
        .pests_above(HIGH_RISK_PEST)
        .take(NAMED_PEST_LIMIT)
        .map(|p| p.pest)
        .collect();
    if !named.is_empty() {
        out.push(Recommendation {
            kind: RecommendationKind::SpecificPests,
            priority: Priority::High,
            title: format!("High Risk: {}", named.join(", ")),
            description: format!("Specific pest risks identified for {}.", crop),
            actions: named.iter().map(|p| format!("Monitor for {}", p)).collect(),
        });
    }

    if zones.soil_health.overall_score < 0.4 {
        out.push(Recommendation::new(
            RecommendationKind::SoilHealth,
            Priority::Medium,
            "Soil Health Improvement Needed",
            "Soil conditions show signs of degradation or poor coverage.",
            &["Soil organic matter enhancement", "Cover crop consideration", "Erosion control measures"],
        ));
    }

    out.truncate(limit);
    out
}
