//! Analysis pipelines
//!
//! Two end-to-end flows over one field sample:
//!
//! - [`FieldAnalyzer::spectral_report`]: indices, per-index statistics and
//!   interpretations, land-cover classification, summary.
//! - [`FieldAnalyzer::assess_field`]: indices (optionally with a measured
//!   NDVI), health zones, pest risk, rendered artifacts and recommendations.

use crate::assessment::{
    analyze_health_zones, assess_pest_risk, generate_recommendations, CropType, HealthZoneReport,
    PestRiskAssessment, Recommendation, RiskLevel,
};
use crate::config::{AnalysisConfig, CropThreshold};
use crate::indices::compute_all_with_ndvi;
use crate::interpretation::{interpret, Interpretation};
use crate::land_cover::{self, LandCoverSummary};
use crate::sources::location_seed;
use crate::types::{Coordinates, DataProvenance, FieldData, IndexKind, IndexSet, SpectralSample};
use crate::utils::statistics::{validate_ndvi, IndexStatistics, NdviTrend, NdviValidation};
use crate::visualization::{render_all, ArtifactStatus, FieldGrid, InMemorySink, VisualizationSink, DEFAULT_GRID};
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Artifacts rendered for every field assessment
const FIELD_ARTIFACTS: [&str; 2] = ["ndvi_map", "health_zones"];

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub total_pixels_analyzed: usize,
    pub indices_calculated: Vec<&'static str>,
    pub dominant_land_cover: &'static str,
    pub analysis_timestamp: DateTime<Utc>,
}

/// Multi-spectral analysis of one sample
#[derive(Debug, Clone, Serialize)]
pub struct SpectralReport {
    /// Keyed by index label (`NDVI`, `NDWI`, ...)
    pub indices_stats: BTreeMap<&'static str, IndexStatistics>,
    /// Interpretation of the mean value, for indices that have one
    pub interpretations: BTreeMap<&'static str, Interpretation>,
    pub land_cover_analysis: LandCoverSummary,
    /// Quality verdict on the NDVI array, absent when NDVI was not computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndvi_validation: Option<NdviValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndvi_trend: Option<NdviTrend>,
    pub summary: ReportSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub analysis_resolution: String,
    pub crop_health_score: f64,
    pub soil_health_score: f64,
    pub pest_risk_level: RiskLevel,
}

/// Field health assessment: zones, pests, artifacts and recommendations
#[derive(Debug, Clone, Serialize)]
pub struct FieldAssessment {
    pub field_coordinates: Coordinates,
    pub crop_type: CropType,
    pub provenance: DataProvenance,
    pub timestamp: DateTime<Utc>,
    pub spectral_indices: BTreeMap<&'static str, IndexStatistics>,
    pub health_zones: HealthZoneReport,
    pub pest_assessment: PestRiskAssessment,
    pub visualizations: BTreeMap<&'static str, ArtifactStatus>,
    pub dashboard: Dashboard,
    pub recommendations: Vec<Recommendation>,
    pub thresholds_used: CropThreshold,
}

// ============================================================================
// Analyzer
// ============================================================================

pub struct FieldAnalyzer {
    config: AnalysisConfig,
    sink: Box<dyn VisualizationSink>,
}

impl FieldAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_sink(config, Box::new(InMemorySink::new()))
    }

    pub fn with_sink(config: AnalysisConfig, sink: Box<dyn VisualizationSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Indices → statistics, interpretations, land cover
    pub fn spectral_report(&self, sample: &SpectralSample, measured_ndvi: Option<f64>) -> Result<SpectralReport> {
        let indices = compute_all_with_ndvi(sample, measured_ndvi).context("Failed to compute spectral indices")?;
        if indices.is_empty() {
            anyhow::bail!("No spectral index could be computed from the supplied bands");
        }

        let indices_stats = index_statistics(&indices)?;

        let ndvi_validation = indices.get(IndexKind::Ndvi).map(|a| validate_ndvi(a.values()));
        if let Some(v) = ndvi_validation.filter(|v| !v.valid) {
            warn!("NDVI quality check failed: {}", v.message());
        }

        let mut interpretations = BTreeMap::new();
        for (kind, array) in indices.iter() {
            if let Some(interpretation) = array.mean().and_then(|mean| interpret(*kind, mean)) {
                interpretations.insert(kind.label(), interpretation);
            }
        }

        let land_cover_analysis = land_cover::classify(&indices).context("Land-cover classification failed")?;

        let summary = ReportSummary {
            total_pixels_analyzed: indices.len_of(IndexKind::Ndvi),
            indices_calculated: indices.names(),
            dominant_land_cover: land_cover_analysis.dominant_land_cover,
            analysis_timestamp: Utc::now(),
        };

        info!(
            "Spectral analysis over {} pixels, indices: {:?}",
            summary.total_pixels_analyzed, summary.indices_calculated
        );

        Ok(SpectralReport {
            indices_stats,
            interpretations,
            land_cover_analysis,
            ndvi_validation,
            ndvi_trend: None,
            summary,
        })
    }

    /// Spectral report with a trend over prior scalar NDVI readings
    pub fn spectral_report_with_history(
        &self,
        sample: &SpectralSample,
        measured_ndvi: Option<f64>,
        ndvi_history: &[f64],
    ) -> Result<SpectralReport> {
        let mut report = self.spectral_report(sample, measured_ndvi)?;
        report.ndvi_trend = Some(NdviTrend::analyze(ndvi_history));
        Ok(report)
    }

    /// Full field health assessment for an explicit month (1-12)
    pub fn assess_field(
        &self,
        field: &FieldData,
        crop: &CropType,
        measured_ndvi: Option<f64>,
        month: u32,
    ) -> Result<FieldAssessment> {
        info!(
            "Assessing {} field at ({:.4}, {:.4})",
            crop, field.coordinates.lat, field.coordinates.lon
        );
        if field.provenance == DataProvenance::Synthetic {
            warn!("Field assessment is running on synthetic data");
        }

        let indices = compute_all_with_ndvi(&field.bands, measured_ndvi)
            .context("Failed to compute spectral indices")?;
        let spectral_indices = index_statistics(&indices)?;

        let thresholds_used = self.config.crop_threshold(crop.as_str());
        let health_zones = analyze_health_zones(&indices, thresholds_used);
        let pest_assessment =
            assess_pest_risk(&indices, &field.weather, field.coordinates, crop, month, &self.config);

        let grid = FieldGrid::resample(&field.bands, DEFAULT_GRID, location_seed(field.coordinates));
        let visualizations = render_all(self.sink.as_ref(), &FIELD_ARTIFACTS, &grid);

        let dashboard = Dashboard {
            analysis_resolution: grid.resolution(),
            crop_health_score: health_zones.crop_health.overall_score,
            soil_health_score: health_zones.soil_health.overall_score,
            pest_risk_level: pest_assessment.risk_level,
        };

        let recommendations =
            generate_recommendations(&health_zones, &pest_assessment, crop, self.config.max_recommendations);

        Ok(FieldAssessment {
            field_coordinates: field.coordinates,
            crop_type: crop.clone(),
            provenance: field.provenance,
            timestamp: Utc::now(),
            spectral_indices,
            health_zones,
            pest_assessment,
            visualizations,
            dashboard,
            recommendations,
            thresholds_used,
        })
    }

    /// Field assessment for the current UTC month
    pub fn assess_field_now(
        &self,
        field: &FieldData,
        crop: &CropType,
        measured_ndvi: Option<f64>,
    ) -> Result<FieldAssessment> {
        self.assess_field(field, crop, measured_ndvi, Utc::now().month())
    }
}

impl Default for FieldAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

fn index_statistics(indices: &IndexSet) -> Result<BTreeMap<&'static str, IndexStatistics>> {
    indices
        .iter()
        .filter(|(_, array)| !array.is_empty())
        .map(|(kind, array)| {
            let stats = IndexStatistics::from_array(array)
                .with_context(|| format!("Failed to summarise {}", kind.label()))?;
            Ok((kind.label(), stats))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Weather;
    use approx::assert_relative_eq;

    fn vegetated() -> SpectralSample {
        SpectralSample::new(vec![0.05, 0.06], vec![0.07, 0.08], vec![0.6, 0.7], vec![0.1, 0.12]).unwrap()
    }

    #[test]
    fn test_spectral_report_on_vegetated_pixels() {
        let report = FieldAnalyzer::default().spectral_report(&vegetated(), None).unwrap();
        // (0.55/0.65 + 0.64/0.76) / 2
        assert_relative_eq!(report.indices_stats["NDVI"].mean, 0.844_13, epsilon = 1e-4);
        assert_eq!(report.interpretations["NDVI"].status_text, "Excellent");
        assert!(!report.interpretations.contains_key("MNDWI"));
        // NDWI is about 0.71 on both pixels, and the water rule runs before vegetation
        assert_eq!(report.summary.dominant_land_cover, "Water");
        assert_eq!(report.summary.total_pixels_analyzed, 2);
        assert_eq!(report.summary.indices_calculated.len(), 5);
        assert!(report.ndvi_trend.is_none());
        assert!(report.ndvi_validation.unwrap().valid);
    }

    #[test]
    fn test_measured_ndvi_only_sample() {
        let sample = SpectralSample::new(vec![], vec![0.1, 0.1, 0.1], vec![], vec![0.2, 0.2, 0.2]).unwrap();
        let report = FieldAnalyzer::default().spectral_report(&sample, Some(0.42)).unwrap();
        assert_relative_eq!(report.indices_stats["NDVI"].mean, 0.42);
        assert_eq!(report.summary.total_pixels_analyzed, 3);
    }

    #[test]
    fn test_report_without_indices_fails() {
        let sample = SpectralSample::new(vec![0.1], vec![], vec![], vec![]).unwrap();
        assert!(FieldAnalyzer::default().spectral_report(&sample, None).is_err());
    }

    #[test]
    fn test_report_with_history() {
        let report = FieldAnalyzer::default()
            .spectral_report_with_history(&vegetated(), None, &[0.5, 0.6, 0.7])
            .unwrap();
        assert_eq!(report.ndvi_trend.unwrap().trend.as_str(), "improving");
    }

    #[test]
    fn test_field_assessment() {
        let field = FieldData {
            bands: vegetated(),
            weather: Weather { temperature: 24.0, humidity: 55.0, pressure: 1013.0 },
            coordinates: Coordinates { lat: 45.0, lon: 5.0 },
            provenance: DataProvenance::Measured,
        };
        let assessment = FieldAnalyzer::default().assess_field(&field, &CropType::Wheat, None, 10).unwrap();

        assert_relative_eq!(assessment.thresholds_used.healthy_ndvi, 0.7);
        assert_eq!(assessment.health_zones.crop_health.pixel_count(), 2);
        assert!(assessment.visualizations.values().all(|s| s.success));
        assert_eq!(assessment.dashboard.analysis_resolution, "20x20 pixels");
        assert_eq!(assessment.pest_assessment.risk_level, RiskLevel::Low);
        assert!(assessment.recommendations.len() <= 5);

        let json = serde_json::to_value(&assessment).unwrap();
        assert_eq!(json["crop_type"], "wheat");
    }
}
