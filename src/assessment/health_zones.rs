//! Health Zones
//!
//! Per-pixel crop-health and soil-health labels with weighted zone scores.
//!
//! Crop health (first match wins):
//! - excellent: `ndvi > healthy_ndvi && ndwi > 0.3`
//! - good: `ndvi > 0.5 && ndwi > 0.2`
//! - moderate: `ndvi > 0.3 && ndwi > 0.1`
//! - poor otherwise
//!
//! Soil health:
//! - degraded: `ndsi > 0.4 && ndvi < 0.3`
//! - moderate: `0.2 < ndsi < 0.4 && 0.3 < ndvi < 0.6`
//! - healthy otherwise
//!
//! The pixel set is the NDVI array. Missing NDWI values read as 0.3 and
//! missing NDSI values as 0.0.

use crate::config::CropThreshold;
use crate::types::{IndexKind, IndexSet};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeMap;

const NEUTRAL_NDWI: f64 = 0.3;
const NEUTRAL_NDSI: f64 = 0.0;
const EMPTY_ZONE_SCORE: f64 = 0.5;
const UNKNOWN_ZONE: &str = "unknown";

/// Label with a fixed weight in the zone score
pub trait ZoneLabel: Copy + Eq + std::hash::Hash {
    fn as_str(&self) -> &'static str;
    fn weight(&self) -> f64;
}

/// Crop-health label of one pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CropHealth {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl CropHealth {
    pub fn classify(ndvi: f64, ndwi: f64, healthy_ndvi: f64) -> Self {
        if ndvi > healthy_ndvi && ndwi > 0.3 {
            CropHealth::Excellent
        } else if ndvi > 0.5 && ndwi > 0.2 {
            CropHealth::Good
        } else if ndvi > 0.3 && ndwi > 0.1 {
            CropHealth::Moderate
        } else {
            CropHealth::Poor
        }
    }
}

impl ZoneLabel for CropHealth {
    fn as_str(&self) -> &'static str {
        match self {
            CropHealth::Excellent => "excellent",
            CropHealth::Good => "good",
            CropHealth::Moderate => "moderate",
            CropHealth::Poor => "poor",
        }
    }

    fn weight(&self) -> f64 {
        match self {
            CropHealth::Excellent => 1.0,
            CropHealth::Good => 0.75,
            CropHealth::Moderate => 0.5,
            CropHealth::Poor => 0.25,
        }
    }
}

/// Soil-health label of one pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilHealth {
    Healthy,
    Moderate,
    Degraded,
}

impl SoilHealth {
    pub fn classify(ndvi: f64, ndsi: f64) -> Self {
        if ndsi > 0.4 && ndvi < 0.3 {
            SoilHealth::Degraded
        } else if ndsi > 0.2 && ndsi < 0.4 && ndvi > 0.3 && ndvi < 0.6 {
            SoilHealth::Moderate
        } else {
            SoilHealth::Healthy
        }
    }
}

impl ZoneLabel for SoilHealth {
    fn as_str(&self) -> &'static str {
        match self {
            SoilHealth::Healthy => "healthy",
            SoilHealth::Moderate => "moderate",
            SoilHealth::Degraded => "degraded",
        }
    }

    fn weight(&self) -> f64 {
        match self {
            SoilHealth::Healthy => 1.0,
            SoilHealth::Moderate => 0.6,
            SoilHealth::Degraded => 0.2,
        }
    }
}

// ============================================================================
// Zone aggregation
// ============================================================================

/// Per-pixel labels plus their aggregate view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSummary<L: ZoneLabel> {
    pub classifications: Vec<L>,
    /// Pixel count per label name
    pub statistics: BTreeMap<&'static str, usize>,
    /// Weighted score in [0, 1]
    pub overall_score: f64,
    /// Most frequent label; ties go to the label seen first
    pub dominant_zone: &'static str,
}

impl<L: ZoneLabel> ZoneSummary<L> {
    pub fn from_labels(classifications: Vec<L>) -> Self {
        if classifications.is_empty() {
            return Self {
                classifications,
                statistics: BTreeMap::new(),
                overall_score: EMPTY_ZONE_SCORE,
                dominant_zone: UNKNOWN_ZONE,
            };
        }

        // label → (count, first position)
        let mut counts: FxHashMap<L, (usize, usize)> = FxHashMap::default();
        for (position, label) in classifications.iter().enumerate() {
            counts.entry(*label).or_insert((0, position)).0 += 1;
        }

        let total = classifications.len() as f64;
        let weighted: f64 = counts.iter().map(|(label, (count, _))| *count as f64 * label.weight()).sum();

        let dominant_zone = counts
            .iter()
            .max_by(|(_, (ca, pa)), (_, (cb, pb))| ca.cmp(cb).then(pb.cmp(pa)))
            .map(|(label, _)| label.as_str())
            .unwrap_or(UNKNOWN_ZONE);

        let statistics = counts.iter().map(|(label, (count, _))| (label.as_str(), *count)).collect();

        Self {
            classifications,
            statistics,
            overall_score: weighted / total,
            dominant_zone,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.classifications.len()
    }

    /// Distinct labels per pixel, 0 for an empty set
    pub fn variability(&self) -> f64 {
        if self.classifications.is_empty() {
            0.0
        } else {
            self.statistics.len() as f64 / self.classifications.len() as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldUniformity {
    pub crop_variability: f64,
    pub soil_variability: f64,
}

/// Crop and soil zones for one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthZoneReport {
    pub crop_health: ZoneSummary<CropHealth>,
    pub soil_health: ZoneSummary<SoilHealth>,
    pub field_uniformity: FieldUniformity,
}

/// Classify every NDVI pixel into crop and soil zones
pub fn analyze_health_zones(indices: &IndexSet, threshold: CropThreshold) -> HealthZoneReport {
    let ndvi = indices.get(IndexKind::Ndvi).map(|a| a.values()).unwrap_or(&[]);
    let ndwi = indices.get(IndexKind::Ndwi).map(|a| a.values()).unwrap_or(&[]);
    let ndsi = indices.get(IndexKind::Ndsi).map(|a| a.values()).unwrap_or(&[]);

    let (crop_labels, soil_labels): (Vec<CropHealth>, Vec<SoilHealth>) = ndvi
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let w = ndwi.get(i).copied().unwrap_or(NEUTRAL_NDWI);
            let s = ndsi.get(i).copied().unwrap_or(NEUTRAL_NDSI);
            (CropHealth::classify(v, w, threshold.healthy_ndvi), SoilHealth::classify(v, s))
        })
        .unzip();

    let crop_health = ZoneSummary::from_labels(crop_labels);
    let soil_health = ZoneSummary::from_labels(soil_labels);

    tracing::debug!(
        "Health zones over {} pixels: crop {} ({:.2}), soil {} ({:.2})",
        crop_health.pixel_count(),
        crop_health.dominant_zone,
        crop_health.overall_score,
        soil_health.dominant_zone,
        soil_health.overall_score
    );

    let field_uniformity = FieldUniformity {
        crop_variability: crop_health.variability(),
        soil_variability: soil_health.variability(),
    };

    HealthZoneReport { crop_health, soil_health, field_uniformity }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndexArray;
    use approx::assert_relative_eq;

    fn rice() -> CropThreshold {
        CropThreshold { healthy_ndvi: 0.8, stress_threshold: 0.15 }
    }

    fn indices(ndvi: Vec<f64>, ndwi: Vec<f64>, ndsi: Vec<f64>) -> IndexSet {
        let mut set = IndexSet::new();
        set.insert(IndexKind::Ndvi, IndexArray::new(ndvi));
        if !ndwi.is_empty() {
            set.insert(IndexKind::Ndwi, IndexArray::new(ndwi));
        }
        if !ndsi.is_empty() {
            set.insert(IndexKind::Ndsi, IndexArray::new(ndsi));
        }
        set
    }

    #[test]
    fn test_crop_health_uses_crop_threshold() {
        assert_eq!(CropHealth::classify(0.85, 0.4, 0.8), CropHealth::Excellent);
        // Above 0.7 but below rice's 0.8 threshold
        assert_eq!(CropHealth::classify(0.75, 0.4, 0.8), CropHealth::Good);
        assert_eq!(CropHealth::classify(0.75, 0.4, 0.7), CropHealth::Excellent);
        assert_eq!(CropHealth::classify(0.4, 0.15, 0.7), CropHealth::Moderate);
        assert_eq!(CropHealth::classify(0.9, 0.05, 0.7), CropHealth::Poor);
    }

    #[test]
    fn test_soil_health_bounds_are_exclusive() {
        assert_eq!(SoilHealth::classify(0.2, 0.5), SoilHealth::Degraded);
        assert_eq!(SoilHealth::classify(0.4, 0.3), SoilHealth::Moderate);
        assert_eq!(SoilHealth::classify(0.4, 0.4), SoilHealth::Healthy);
        assert_eq!(SoilHealth::classify(0.3, 0.3), SoilHealth::Healthy);
    }

    #[test]
    fn test_zone_scores() {
        let report = analyze_health_zones(
            &indices(vec![0.9, 0.6, 0.4, 0.1], vec![0.4, 0.25, 0.15, 0.0], vec![0.0, 0.0, 0.3, 0.5]),
            rice(),
        );
        // excellent + good + moderate + poor
        assert_relative_eq!(report.crop_health.overall_score, (1.0 + 0.75 + 0.5 + 0.25) / 4.0, epsilon = 1e-12);
        // healthy, healthy, moderate, degraded
        assert_relative_eq!(report.soil_health.overall_score, (1.0 + 1.0 + 0.6 + 0.2) / 4.0, epsilon = 1e-12);
        assert_eq!(report.soil_health.dominant_zone, "healthy");
        assert_eq!(report.soil_health.statistics["degraded"], 1);
        assert_relative_eq!(report.field_uniformity.crop_variability, 1.0);
        assert_relative_eq!(report.field_uniformity.soil_variability, 0.75);
    }

    #[test]
    fn test_dominant_tie_goes_to_first_seen() {
        let summary = ZoneSummary::from_labels(vec![CropHealth::Poor, CropHealth::Good, CropHealth::Good, CropHealth::Poor]);
        assert_eq!(summary.dominant_zone, "poor");
    }

    #[test]
    fn test_missing_ndwi_reads_neutral() {
        // NDWI 0.3 is not > 0.3, so the best label is good
        let report = analyze_health_zones(&indices(vec![0.9, 0.9], vec![], vec![]), rice());
        assert_eq!(report.crop_health.dominant_zone, "good");
        assert_eq!(report.soil_health.dominant_zone, "healthy");
    }

    #[test]
    fn test_empty_pixel_set_defaults() {
        let report = analyze_health_zones(&IndexSet::new(), rice());
        assert_relative_eq!(report.crop_health.overall_score, 0.5);
        assert_eq!(report.crop_health.dominant_zone, "unknown");
        assert_relative_eq!(report.soil_health.overall_score, 0.5);
        assert_relative_eq!(report.field_uniformity.crop_variability, 0.0);
    }
}
