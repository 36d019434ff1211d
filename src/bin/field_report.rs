//! Field Report
//!
//! Runs the full analysis over one spectral sample and prints a JSON report:
//! spectral analysis, field health assessment and an ensemble prediction for
//! a reference feature row.
//!
//! Run with: cargo run --features cli --bin field_report -- [sample.json] [config.json]
//!
//! Without a sample path a synthetic field at (30.9, 75.85) is used.

use anyhow::{Context, Result};
use cropsense::assessment::CropType;
use cropsense::repository::{record_prediction, FieldRef, InMemoryRepository};
use cropsense::sources::{FieldDataSource, SyntheticFieldSource};
use cropsense::{
    AnalysisConfig, Coordinates, DataProvenance, FieldAnalyzer, FieldData, PredictionService,
    SpectralSample, Weather,
};
use serde_json::json;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Favourable growing conditions: ndvi, temperature, humidity, soil moisture,
/// pH, precipitation, solar radiation, day of year, latitude
const REFERENCE_FEATURES: [f64; 9] = [0.75, 25.0, 60.0, 45.0, 6.8, 20.0, 22.0, 150.0, 40.0];

fn load_sample(path: &Path) -> Result<SpectralSample> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sample file: {:?}", path))?;
    let sample: SpectralSample = serde_json::from_str(&contents)
        .with_context(|| "Failed to parse spectral sample JSON")?;
    sample.validate().with_context(|| format!("Invalid sample in {:?}", path))?;
    Ok(sample)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cropsense=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(2) {
        Some(path) => AnalysisConfig::load(Path::new(path))?,
        None => AnalysisConfig::default(),
    };

    let coordinates = Coordinates { lat: 30.9, lon: 75.85 };
    let field = match args.get(1) {
        Some(path) => FieldData {
            bands: load_sample(Path::new(path))?,
            weather: Weather::default(),
            coordinates,
            provenance: DataProvenance::Measured,
        },
        None => {
            info!("No sample given, generating a synthetic field");
            SyntheticFieldSource::new().fetch(coordinates)?
        }
    };

    let analyzer = FieldAnalyzer::new(config.clone());
    let spectral = analyzer.spectral_report(&field.bands, None)?;
    let crop = CropType::Rice;
    let assessment = analyzer.assess_field_now(&field, &crop, None)?;

    let service = PredictionService::new(config.ensemble.clone());
    let prediction = service.predict_one(&REFERENCE_FEATURES)?;

    let repo = InMemoryRepository::new();
    let field_ref = FieldRef { id: 1, user_id: 1, name: "Demo field".into() };
    for result in prediction.results() {
        let stored = record_prediction(&repo, &field_ref, result)?;
        info!("Stored prediction {} (alert: {:?})", stored.prediction_id, stored.alert_id);
    }

    let report = json!({
        "spectral_analysis": spectral,
        "field_assessment": assessment,
        "prediction": prediction,
        "model_info": service.model_info(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
