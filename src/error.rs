//! Error types for the spectral analysis core
//!
//! Only unrecoverable conditions surface here. Missing indices inside the
//! assessors degrade to neutral defaults instead of producing an error.

use thiserror::Error;

/// Failure kinds produced by the analysis core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectralError {
    /// A band required by an index is absent or empty
    #[error("Missing data for {index}: band '{band}' is empty")]
    MissingData { index: &'static str, band: &'static str },

    /// Two bands fed to the same index differ in pixel count
    #[error("Length mismatch for {index}: {left} vs {right} pixels")]
    LengthMismatch { index: &'static str, left: usize, right: usize },

    /// A statistic or classification was asked to operate on zero pixels
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// Prediction requested before the ensemble was trained
    #[error("Model not trained. Train the ensemble before predicting")]
    ModelNotTrained,

    /// A value lies outside its physical range and cannot be clamped
    #[error("Invalid range: {name} = {value}")]
    InvalidRange { name: &'static str, value: f64 },

    /// Configuration could not be applied
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistence collaborator failure
    #[error("Repository error: {0}")]
    Repository(String),

    /// Field data source failure
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Visualization sink failure
    #[error("Visualization error: {0}")]
    Visualization(String),
}

impl SpectralError {
    /// Stable machine-readable tag for the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            SpectralError::MissingData { .. } => "missing_data",
            SpectralError::LengthMismatch { .. } => "length_mismatch",
            SpectralError::EmptyInput(_) => "empty_input",
            SpectralError::ModelNotTrained => "model_not_trained",
            SpectralError::InvalidRange { .. } => "invalid_range",
            SpectralError::Config(_) => "config",
            SpectralError::Repository(_) => "repository",
            SpectralError::DataSource(_) => "data_source",
            SpectralError::Visualization(_) => "visualization",
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, SpectralError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        let err = SpectralError::MissingData { index: "ndvi", band: "red" };
        assert_eq!(err.kind(), "missing_data");
        assert_eq!(err.to_string(), "Missing data for ndvi: band 'red' is empty");
        assert_eq!(SpectralError::ModelNotTrained.kind(), "model_not_trained");
        assert_eq!(SpectralError::EmptyInput("stats").kind(), "empty_input");
    }
}
