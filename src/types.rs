//! Core value types shared across the analysis pipeline
//!
//! Bands arrive as parallel reflectance arrays (one value per pixel). Every
//! derived entity is an immutable value produced by a pure transformation.

use crate::error::{Result, SpectralError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Bands
// ============================================================================

/// Spectral band identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Red,
    Green,
    Nir,
    Swir,
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Red => "red",
            Band::Green => "green",
            Band::Nir => "nir",
            Band::Swir => "swir",
        }
    }
}

/// Multi-spectral reflectance sample for one field
///
/// Absent bands deserialize as empty arrays. All non-empty bands share the
/// same pixel count; [`SpectralSample::validate`] enforces this once at the
/// boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralSample {
    #[serde(default)]
    pub red: Vec<f64>,
    #[serde(default)]
    pub green: Vec<f64>,
    #[serde(default)]
    pub nir: Vec<f64>,
    #[serde(default)]
    pub swir: Vec<f64>,
}

impl SpectralSample {
    /// Build a sample and check the equal-length invariant
    pub fn new(red: Vec<f64>, green: Vec<f64>, nir: Vec<f64>, swir: Vec<f64>) -> Result<Self> {
        let sample = Self { red, green, nir, swir };
        sample.validate()?;
        Ok(sample)
    }

    pub fn band(&self, band: Band) -> &[f64] {
        match band {
            Band::Red => &self.red,
            Band::Green => &self.green,
            Band::Nir => &self.nir,
            Band::Swir => &self.swir,
        }
    }

    pub fn has_band(&self, band: Band) -> bool {
        !self.band(band).is_empty()
    }

    /// Pixel count of the sample (length of the first non-empty band)
    pub fn pixel_count(&self) -> usize {
        [Band::Red, Band::Green, Band::Nir, Band::Swir]
            .iter()
            .map(|b| self.band(*b).len())
            .find(|len| *len > 0)
            .unwrap_or(0)
    }

    /// All present bands must have identical length
    pub fn validate(&self) -> Result<()> {
        let expected = self.pixel_count();
        for band in [Band::Red, Band::Green, Band::Nir, Band::Swir] {
            let len = self.band(band).len();
            if len > 0 && len != expected {
                return Err(SpectralError::LengthMismatch {
                    index: band.as_str(),
                    left: expected,
                    right: len,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Indices
// ============================================================================

/// Normalized-difference index kinds computed by the index engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Ndvi,
    Ndwi,
    Mndwi,
    Ndsi,
    RedEdgeNdvi,
}

impl IndexKind {
    pub const ALL: [IndexKind; 5] = [
        IndexKind::Ndvi,
        IndexKind::Ndwi,
        IndexKind::Mndwi,
        IndexKind::Ndsi,
        IndexKind::RedEdgeNdvi,
    ];

    /// Lowercase key used in result mappings
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Ndvi => "ndvi",
            IndexKind::Ndwi => "ndwi",
            IndexKind::Mndwi => "mndwi",
            IndexKind::Ndsi => "ndsi",
            IndexKind::RedEdgeNdvi => "red_edge_ndvi",
        }
    }

    /// Uppercase display label
    pub fn label(&self) -> &'static str {
        match self {
            IndexKind::Ndvi => "NDVI",
            IndexKind::Ndwi => "NDWI",
            IndexKind::Mndwi => "MNDWI",
            IndexKind::Ndsi => "NDSI",
            IndexKind::RedEdgeNdvi => "RE-NDVI",
        }
    }

    /// Bands the index formula reads, in formula order
    pub fn required_bands(&self) -> [Band; 2] {
        match self {
            IndexKind::Ndvi => [Band::Red, Band::Nir],
            IndexKind::Ndwi => [Band::Nir, Band::Swir],
            IndexKind::Mndwi => [Band::Green, Band::Swir],
            IndexKind::Ndsi => [Band::Swir, Band::Green],
            IndexKind::RedEdgeNdvi => [Band::Red, Band::Nir],
        }
    }
}

/// Per-pixel index values, clamped to [-1, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "Vec<f64>")]
pub struct IndexArray(Vec<f64>);

impl From<Vec<f64>> for IndexArray {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl From<IndexArray> for Vec<f64> {
    fn from(array: IndexArray) -> Self {
        array.0
    }
}

impl IndexArray {
    /// Wrap values, clamping to [-1, 1] and mapping non-finite values to 0
    pub fn new(values: Vec<f64>) -> Self {
        Self(values.into_iter().map(clamp_index).collect())
    }

    /// Array of `len` copies of `value`
    pub fn filled(value: f64, len: usize) -> Self {
        Self(vec![clamp_index(value); len])
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Arithmetic mean, `None` for an empty array
    pub fn mean(&self) -> Option<f64> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.iter().sum::<f64>() / self.0.len() as f64)
        }
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }
}

#[inline]
pub(crate) fn clamp_index(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Result of the batch entry point: only computed indices are present
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IndexSet(BTreeMap<IndexKind, IndexArray>);

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: IndexKind, values: IndexArray) {
        self.0.insert(kind, values);
    }

    pub fn get(&self, kind: IndexKind) -> Option<&IndexArray> {
        self.0.get(&kind)
    }

    pub fn contains(&self, kind: IndexKind) -> bool {
        self.0.contains_key(&kind)
    }

    /// Length of one index, 0 when absent
    pub fn len_of(&self, kind: IndexKind) -> usize {
        self.0.get(&kind).map(|a| a.len()).unwrap_or(0)
    }

    /// Lowercase names of the computed indices
    pub fn names(&self) -> Vec<&'static str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IndexKind, &IndexArray)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Weather conditions reported by the field data source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// Air temperature (°C)
    pub temperature: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Surface pressure (hPa)
    #[serde(default = "default_pressure")]
    pub pressure: f64,
}

fn default_pressure() -> f64 {
    1013.0
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            humidity: 60.0,
            pressure: default_pressure(),
        }
    }
}

/// Geographic position of a field
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Where a field data payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataProvenance {
    Measured,
    Synthetic,
}

/// Payload supplied by the field/weather data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldData {
    pub bands: SpectralSample,
    pub weather: Weather,
    pub coordinates: Coordinates,
    pub provenance: DataProvenance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_array_clamps_and_sanitizes() {
        let arr = IndexArray::new(vec![1.5, -2.0, 0.3, f64::NAN, f64::INFINITY]);
        assert_eq!(arr.values(), &[1.0, -1.0, 0.3, 0.0, 0.0]);
    }

    #[test]
    fn test_index_array_deserialize_clamps() {
        let arr: IndexArray = serde_json::from_str("[5.0, -3.0, 0.2]").unwrap();
        assert_eq!(arr.values(), &[1.0, -1.0, 0.2]);
        assert_eq!(serde_json::to_string(&arr).unwrap(), "[1.0,-1.0,0.2]");
    }

    #[test]
    fn test_sample_length_mismatch() {
        let err = SpectralSample::new(vec![0.1, 0.2], vec![], vec![0.5], vec![]).unwrap_err();
        assert_eq!(err.kind(), "length_mismatch");
    }

    #[test]
    fn test_sample_partial_bands_ok() {
        let sample = SpectralSample::new(vec![], vec![0.1, 0.2], vec![], vec![0.3, 0.4]).unwrap();
        assert_eq!(sample.pixel_count(), 2);
        assert!(!sample.has_band(Band::Red));
        assert!(sample.has_band(Band::Swir));
    }

    #[test]
    fn test_sample_deserializes_missing_bands() {
        let sample: SpectralSample = serde_json::from_str(r#"{"red": [0.1], "nir": [0.6]}"#).unwrap();
        assert!(sample.green.is_empty());
        assert_eq!(sample.pixel_count(), 1);
    }
}
