//! Pipeline Integration Tests
//!
//! End-to-end checks through the public API: index engine, statistics,
//! interpretation, land cover, pest risk and the prediction ensemble.

use approx::assert_relative_eq;
use cropsense::assessment::assess_pest_risk;
use cropsense::indices::{compute_all, ndvi};
use cropsense::land_cover::{self, LandCover};
use cropsense::model::{EnsembleModel, HealthStatus};
use cropsense::{
    interpret, AnalysisConfig, Coordinates, CropType, EnsembleConfig, FieldAnalyzer, IndexArray, IndexKind,
    IndexSet, IndexStatistics, PredictionService, RiskLevel, SpectralError, SpectralSample, Weather,
};

const CANONICAL: [f64; 9] = [0.75, 25.0, 60.0, 45.0, 6.8, 20.0, 22.0, 150.0, 40.0];

fn vegetated_sample() -> SpectralSample {
    SpectralSample::new(vec![0.05, 0.06], vec![0.07, 0.08], vec![0.6, 0.7], vec![0.1, 0.12]).unwrap()
}

#[test]
fn ndvi_formula_and_zero_denominator() {
    let out = ndvi(&[0.05, 0.0], &[0.65, 0.0]).unwrap();
    assert_relative_eq!(out.values()[0], 0.6 / 0.7, epsilon = 1e-12);
    assert_relative_eq!(out.values()[0], 0.857, epsilon = 1e-3);
    assert_eq!(out.values()[1], 0.0);
}

#[test]
fn every_index_stays_in_range() {
    let sample = SpectralSample::new(
        vec![0.0, 0.9, 0.2, 1.0],
        vec![0.3, 0.0, 0.5, 0.0],
        vec![0.8, 0.0, 0.2, 0.0],
        vec![0.0, 0.4, 0.9, 0.0],
    )
    .unwrap();
    let indices = compute_all(&sample).unwrap();
    assert_eq!(indices.len(), 5);
    for (_, array) in indices.iter() {
        assert!(array.values().iter().all(|v| v.is_finite() && (-1.0..=1.0).contains(v)));
    }
}

#[test]
fn statistics_are_idempotent() {
    let array = IndexArray::new(vec![0.2, 0.5, 0.9, 0.4]);
    let first = IndexStatistics::from_array(&array).unwrap();
    let second = IndexStatistics::from_array(&array).unwrap();
    assert_eq!(first, second);
}

#[test]
fn snow_rule_takes_precedence() {
    let mut indices = IndexSet::new();
    indices.insert(IndexKind::Ndvi, IndexArray::new(vec![0.8]));
    indices.insert(IndexKind::Ndwi, IndexArray::new(vec![0.5]));
    indices.insert(IndexKind::Ndsi, IndexArray::new(vec![0.5]));
    let summary = land_cover::classify(&indices).unwrap();
    assert_eq!(summary.map, vec![LandCover::SnowIce]);
}

#[test]
fn ndvi_boundary_falls_through_to_good() {
    let interpretation = interpret(IndexKind::Ndvi, 0.4).unwrap();
    assert_eq!(interpretation.status_text, "Good");
}

#[test]
fn end_to_end_vegetated_sample() {
    let report = FieldAnalyzer::default().spectral_report(&vegetated_sample(), None).unwrap();
    assert_relative_eq!(report.indices_stats["NDVI"].mean, 0.844_13, epsilon = 1e-4);
    assert_eq!(report.interpretations["NDVI"].status_text, "Excellent");
    // High NIR against low SWIR pushes NDWI past 0.3, so water wins over vegetation
    assert_eq!(report.land_cover_analysis.map, vec![LandCover::Water, LandCover::Water]);
    assert_eq!(report.land_cover_analysis.land_cover_stats["Water"].percentage, 100.0);
}

#[test]
fn dense_vegetation_needs_moderate_ndwi() {
    // NDVI 0.846, NDWI 0.263, MNDWI < 0, NDSI 0.273
    let sample = SpectralSample::new(vec![0.05], vec![0.2], vec![0.6], vec![0.35]).unwrap();
    let report = FieldAnalyzer::default().spectral_report(&sample, None).unwrap();
    assert_eq!(report.land_cover_analysis.map, vec![LandCover::DenseVegetation]);
    assert_eq!(report.summary.dominant_land_cover, "Dense Vegetation");
}

#[test]
fn rice_in_humid_heat_is_high_risk() {
    let mut indices = IndexSet::new();
    indices.insert(IndexKind::Ndvi, IndexArray::new(vec![0.1, 0.6, 0.2, 0.5]));
    indices.insert(IndexKind::Ndwi, IndexArray::new(vec![0.0, 0.1, 0.05, 0.1]));

    let weather = Weather { temperature: 28.0, humidity: 85.0, pressure: 1013.0 };
    let coordinates = Coordinates { lat: 10.0, lon: 76.0 };
    let assessment =
        assess_pest_risk(&indices, &weather, coordinates, &CropType::Rice, 7, &AnalysisConfig::default());

    assert_relative_eq!(assessment.risk_factors.environmental, 0.9, epsilon = 1e-12);
    assert!(assessment.overall_risk >= 0.7);
    assert_eq!(assessment.risk_level, RiskLevel::High);
    assert!(assessment.environmental_conditions.favorable_for_pests);
    assert!(assessment.pest_risk("brown_planthopper").is_some());
}

#[test]
fn untrained_model_refuses_to_predict() {
    let model = EnsembleModel::new();
    let err = model.predict(&[CANONICAL.to_vec()]).unwrap_err();
    assert_eq!(err, SpectralError::ModelNotTrained);
}

#[test]
fn canonical_row_predicts_healthy() {
    let service = PredictionService::new(EnsembleConfig::fast());
    let prediction = service.predict_one(&CANONICAL).unwrap();
    let result = &prediction.results()[0];

    assert!(result.health_score >= 70.0, "score {}", result.health_score);
    assert!(matches!(result.status, HealthStatus::Excellent | HealthStatus::Good));
    assert_relative_eq!(result.ndvi_value, 0.75);
    assert!(service.is_trained());

    let json = serde_json::to_value(&prediction).unwrap();
    assert!(json.is_object());
}

#[test]
fn sample_json_missing_bands_default_empty() {
    let sample: SpectralSample = serde_json::from_str(r#"{"red": [0.1, 0.2], "nir": [0.5, 0.6]}"#).unwrap();
    let indices = compute_all(&sample).unwrap();
    assert_eq!(indices.names(), vec!["ndvi", "red_edge_ndvi"]);
}
