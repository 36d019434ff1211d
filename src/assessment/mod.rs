//! Field Assessment
//!
//! Health zones, pest risk and the recommendations built on top of them.
//! Every assessor degrades missing indices to neutral values and always
//! returns a structurally complete result.

pub mod crop;
pub mod health_zones;
pub mod pest_risk;
pub mod recommendations;

pub use crop::CropType;
pub use health_zones::{analyze_health_zones, CropHealth, FieldUniformity, HealthZoneReport, SoilHealth, ZoneSummary};
pub use pest_risk::{
    assess_pest_risk, assess_pest_risk_now, EnvironmentalConditions, PestRiskAssessment, RiskFactors,
    RiskLevel,
};
pub use recommendations::{generate_recommendations, Priority, Recommendation, RecommendationKind};
