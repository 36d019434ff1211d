//! Land-Cover Classifier
//!
//! Per-pixel rule classification over the NDVI/NDWI/MNDWI/NDSI stack.
//!
//! Decision order (first match wins):
//! 1. `ndsi > 0.4` → Snow/Ice
//! 2. `mndwi > 0.3 || ndwi > 0.3` → Water
//! 3. `ndvi > 0.6` → Dense Vegetation
//! 4. `ndvi > 0.2` → Sparse Vegetation
//! 5. `ndvi < -0.1` → Urban/Built-up
//! 6. otherwise → Bare Soil/Rock
//!
//! Arrays are truncated to the shortest non-empty input. Absent arrays are
//! backfilled with neutral constants (NDVI 0.5, others 0.0) up to that length.

use crate::error::{Result, SpectralError};
use crate::types::{IndexKind, IndexSet};
use crate::utils::statistics::{round_to, IndexStatistics};
use serde::Serialize;
use std::collections::BTreeMap;

/// Land-cover label, numbered 0..=6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LandCover {
    Unknown = 0,
    Water = 1,
    SnowIce = 2,
    DenseVegetation = 3,
    SparseVegetation = 4,
    BareSoil = 5,
    Urban = 6,
}

impl LandCover {
    pub const ALL: [LandCover; 7] = [
        LandCover::Unknown,
        LandCover::Water,
        LandCover::SnowIce,
        LandCover::DenseVegetation,
        LandCover::SparseVegetation,
        LandCover::BareSoil,
        LandCover::Urban,
    ];

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            LandCover::Unknown => "Unknown",
            LandCover::Water => "Water",
            LandCover::SnowIce => "Snow/Ice",
            LandCover::DenseVegetation => "Dense Vegetation",
            LandCover::SparseVegetation => "Sparse Vegetation",
            LandCover::BareSoil => "Bare Soil/Rock",
            LandCover::Urban => "Urban/Built-up",
        }
    }

    /// Map display color
    pub fn color(&self) -> &'static str {
        match self {
            LandCover::Unknown => "#808080",
            LandCover::Water => "#6A5ACD",
            LandCover::SnowIce => "#FF00FF",
            LandCover::DenseVegetation => "#228B22",
            LandCover::SparseVegetation => "#9ACD32",
            LandCover::BareSoil => "#4169E1",
            LandCover::Urban => "#696969",
        }
    }
}

/// Classify a single pixel
#[inline]
pub fn classify_pixel(ndvi: f64, ndwi: f64, mndwi: f64, ndsi: f64) -> LandCover {
    if ndsi > 0.4 {
        LandCover::SnowIce
    } else if mndwi > 0.3 || ndwi > 0.3 {
        LandCover::Water
    } else if ndvi > 0.6 {
        LandCover::DenseVegetation
    } else if ndvi > 0.2 {
        LandCover::SparseVegetation
    } else if ndvi < -0.1 {
        LandCover::Urban
    } else {
        LandCover::BareSoil
    }
}

// ============================================================================
// Aligned index stack
// ============================================================================

/// The four classification inputs, truncated/backfilled to a common length
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStack {
    pub ndvi: Vec<f64>,
    pub ndwi: Vec<f64>,
    pub mndwi: Vec<f64>,
    pub ndsi: Vec<f64>,
}

impl IndexStack {
    /// Align the stack; fails when no input array is non-empty
    pub fn align(indices: &IndexSet) -> Result<Self> {
        let inputs = [IndexKind::Ndvi, IndexKind::Ndwi, IndexKind::Mndwi, IndexKind::Ndsi];
        let common = inputs
            .iter()
            .map(|k| indices.len_of(*k))
            .filter(|len| *len > 0)
            .min()
            .unwrap_or(0);

        if common == 0 {
            return Err(SpectralError::EmptyInput("No valid index data"));
        }

        let take = |kind: IndexKind, neutral: f64| -> Vec<f64> {
            match indices.get(kind) {
                Some(array) if !array.is_empty() => array.values()[..common].to_vec(),
                _ => vec![neutral; common],
            }
        };

        Ok(Self {
            ndvi: take(IndexKind::Ndvi, 0.5),
            ndwi: take(IndexKind::Ndwi, 0.0),
            mndwi: take(IndexKind::Mndwi, 0.0),
            ndsi: take(IndexKind::Ndsi, 0.0),
        })
    }

    pub fn len(&self) -> usize {
        self.ndvi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ndvi.is_empty()
    }

    pub fn classify(&self) -> Vec<LandCover> {
        (0..self.len())
            .map(|i| classify_pixel(self.ndvi[i], self.ndwi[i], self.mndwi[i], self.ndsi[i]))
            .collect()
    }
}

// ============================================================================
// Aggregate view
// ============================================================================

/// Share of one label in the classified map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandCoverShare {
    /// Percent of pixels, 1 decimal
    pub percentage: f64,
    pub pixel_count: usize,
    pub color: &'static str,
}

/// Aggregate land-cover report over one index stack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandCoverSummary {
    /// Per-pixel labels
    #[serde(skip)]
    pub map: Vec<LandCover>,
    /// Only labels with at least one pixel
    pub land_cover_stats: BTreeMap<&'static str, LandCoverShare>,
    /// Statistics over the truncated arrays, keyed by index label
    pub index_stats: BTreeMap<&'static str, IndexStatistics>,
    pub total_pixels: usize,
    pub dominant_land_cover: &'static str,
}

/// Classify an index set and aggregate the per-pixel labels
pub fn classify(indices: &IndexSet) -> Result<LandCoverSummary> {
    let stack = IndexStack::align(indices)?;
    let map = stack.classify();
    let total = map.len();

    let mut counts = [0usize; 7];
    for label in &map {
        counts[label.code() as usize] += 1;
    }

    let mut land_cover_stats = BTreeMap::new();
    let mut dominant: Option<(LandCover, usize)> = None;
    for label in LandCover::ALL {
        let count = counts[label.code() as usize];
        if count == 0 {
            continue;
        }
        let percentage = count as f64 / total as f64 * 100.0;
        land_cover_stats.insert(
            label.display_text(),
            LandCoverShare {
                percentage: round_to(percentage, 1),
                pixel_count: count,
                color: label.color(),
            },
        );
        // Ties go to the lower label code
        if dominant.map_or(true, |(_, best)| count > best) {
            dominant = Some((label, count));
        }
    }

    let mut index_stats = BTreeMap::new();
    for (kind, values) in [
        (IndexKind::Ndvi, &stack.ndvi),
        (IndexKind::Ndwi, &stack.ndwi),
        (IndexKind::Mndwi, &stack.mndwi),
        (IndexKind::Ndsi, &stack.ndsi),
    ] {
        index_stats.insert(kind.label(), IndexStatistics::compute(values)?);
    }

    let dominant_land_cover = dominant
        .map(|(label, _)| label.display_text())
        .unwrap_or(LandCover::Unknown.display_text());

    tracing::debug!("Classified {} pixels, dominant: {}", total, dominant_land_cover);

    Ok(LandCoverSummary {
        map,
        land_cover_stats,
        index_stats,
        total_pixels: total,
        dominant_land_cover,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndexArray;
    use approx::assert_relative_eq;

    fn set(entries: &[(IndexKind, Vec<f64>)]) -> IndexSet {
        let mut set = IndexSet::new();
        for (kind, values) in entries {
            set.insert(*kind, IndexArray::new(values.clone()));
        }
        set
    }

    #[test]
    fn test_snow_wins_over_water_and_vegetation() {
        assert_eq!(classify_pixel(0.8, 0.5, 0.0, 0.5), LandCover::SnowIce);
    }

    #[test]
    fn test_decision_order() {
        assert_eq!(classify_pixel(0.8, 0.5, 0.0, 0.0), LandCover::Water);
        assert_eq!(classify_pixel(0.8, 0.0, 0.31, 0.0), LandCover::Water);
        assert_eq!(classify_pixel(0.7, 0.0, 0.0, 0.0), LandCover::DenseVegetation);
        assert_eq!(classify_pixel(0.6, 0.0, 0.0, 0.0), LandCover::SparseVegetation);
        assert_eq!(classify_pixel(0.2, 0.0, 0.0, 0.0), LandCover::BareSoil);
        assert_eq!(classify_pixel(-0.1, 0.0, 0.0, 0.0), LandCover::BareSoil);
        assert_eq!(classify_pixel(-0.2, 0.0, 0.0, 0.0), LandCover::Urban);
    }

    #[test]
    fn test_codes_round_trip() {
        for label in LandCover::ALL {
            assert_eq!(LandCover::from_code(label.code()), Some(label));
        }
        assert_eq!(LandCover::from_code(7), None);
    }

    #[test]
    fn test_truncates_to_shortest_array() {
        let indices = set(&[
            (IndexKind::Ndvi, vec![0.8, 0.8, 0.8, 0.8]),
            (IndexKind::Ndwi, vec![0.0, 0.0, 0.0]),
            (IndexKind::Mndwi, vec![0.0, 0.5]),
            (IndexKind::Ndsi, vec![0.0, 0.0, 0.0]),
        ]);
        let summary = classify(&indices).unwrap();
        assert_eq!(summary.total_pixels, 2);
        assert_eq!(summary.map, vec![LandCover::DenseVegetation, LandCover::Water]);
        assert_relative_eq!(summary.land_cover_stats["Water"].percentage, 50.0);
        // Tie resolved toward the lower label code
        assert_eq!(summary.dominant_land_cover, "Water");
    }

    #[test]
    fn test_backfills_absent_arrays() {
        let indices = set(&[(IndexKind::Ndwi, vec![0.0, 0.0, 0.0])]);
        let summary = classify(&indices).unwrap();
        // NDVI backfilled with 0.5 → sparse vegetation everywhere
        assert_eq!(summary.dominant_land_cover, "Sparse Vegetation");
        assert_eq!(summary.land_cover_stats["Sparse Vegetation"].pixel_count, 3);
        assert_eq!(summary.land_cover_stats.len(), 1);
        assert_relative_eq!(summary.index_stats["NDVI"].mean, 0.5);
    }

    #[test]
    fn test_percentages_rounded() {
        let indices = set(&[(IndexKind::Ndvi, vec![0.8, 0.8, 0.1])]);
        let summary = classify(&indices).unwrap();
        assert_relative_eq!(summary.land_cover_stats["Dense Vegetation"].percentage, 66.7);
        assert_relative_eq!(summary.land_cover_stats["Bare Soil/Rock"].percentage, 33.3);
        assert_eq!(summary.land_cover_stats["Dense Vegetation"].color, "#228B22");
    }

    #[test]
    fn test_empty_stack_fails() {
        let err = classify(&IndexSet::new()).unwrap_err();
        assert_eq!(err, SpectralError::EmptyInput("No valid index data"));
    }
}
