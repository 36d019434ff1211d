//! Index Engine
//!
//! Normalized-difference spectral indices computed elementwise over band
//! arrays:
//!
//! | Index | Formula |
//! |---|---|
//! | NDVI | (nir - red) / (nir + red) |
//! | NDWI | (nir - swir) / (nir + swir) |
//! | MNDWI | (green - swir) / (green + swir) |
//! | NDSI | (swir - green) / (swir + green) |
//! | RE-NDVI | (1.1·nir - 0.9·red) / (1.1·nir + 0.9·red) |
//!
//! NDSI and MNDWI share the same band pair with opposite sign. Callers must
//! pass bands in the documented order.
//!
//! RE-NDVI approximates the red-edge index from red/nir because no genuine
//! red-edge band is sampled.
//!
//! A zero denominator yields 0 for that pixel. Every output is clamped to
//! [-1, 1].

use crate::error::{Result, SpectralError};
use crate::types::{Band, IndexArray, IndexKind, IndexSet, SpectralSample};
use rayon::prelude::*;

/// Red-edge approximation weights
const RED_EDGE_NIR_WEIGHT: f64 = 1.1;
const RED_EDGE_RED_WEIGHT: f64 = 0.9;

// ============================================================================
// Generic normalized difference
// ============================================================================

/// `(a - b) / (a + b)` per pixel, 0 where `a + b == 0`
#[inline]
pub(crate) fn safe_normalized_difference(a: f64, b: f64) -> f64 {
    let denominator = a + b;
    if denominator == 0.0 {
        0.0
    } else {
        (a - b) / denominator
    }
}

/// Validate the band pair and apply `f` to every pixel in parallel
fn apply_pairwise<F>(
    index: IndexKind,
    a: &[f64],
    b: &[f64],
    f: F,
) -> Result<IndexArray>
where
    F: Fn(f64, f64) -> f64 + Sync,
{
    let [band_a, band_b] = index.required_bands();
    if a.is_empty() {
        return Err(SpectralError::MissingData { index: index.as_str(), band: band_a.as_str() });
    }
    if b.is_empty() {
        return Err(SpectralError::MissingData { index: index.as_str(), band: band_b.as_str() });
    }
    if a.len() != b.len() {
        return Err(SpectralError::LengthMismatch {
            index: index.as_str(),
            left: a.len(),
            right: b.len(),
        });
    }

    let values: Vec<f64> = a
        .par_iter()
        .zip(b.par_iter())
        .map(|(&x, &y)| f(x, y))
        .collect();

    let array = IndexArray::new(values);
    log_range(index, &array);
    Ok(array)
}

fn log_range(index: IndexKind, array: &IndexArray) {
    let (min, max) = array
        .values()
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    tracing::debug!(
        "Calculated {} for {} pixels, range: {:.3} to {:.3}",
        index.label(),
        array.len(),
        min,
        max
    );
}

// ============================================================================
// Individual indices
// ============================================================================

/// Normalized Difference Vegetation Index
pub fn ndvi(red: &[f64], nir: &[f64]) -> Result<IndexArray> {
    apply_pairwise(IndexKind::Ndvi, red, nir, |red, nir| safe_normalized_difference(nir, red))
}

/// Normalized Difference Water Index
pub fn ndwi(nir: &[f64], swir: &[f64]) -> Result<IndexArray> {
    apply_pairwise(IndexKind::Ndwi, nir, swir, safe_normalized_difference)
}

/// Modified Normalized Difference Water Index
pub fn mndwi(green: &[f64], swir: &[f64]) -> Result<IndexArray> {
    apply_pairwise(IndexKind::Mndwi, green, swir, safe_normalized_difference)
}

/// Normalized Difference Snow Index, `(swir - green) / (swir + green)`
pub fn ndsi(swir: &[f64], green: &[f64]) -> Result<IndexArray> {
    apply_pairwise(IndexKind::Ndsi, swir, green, safe_normalized_difference)
}

/// Red-edge NDVI approximated from red and nir
pub fn red_edge_ndvi(red: &[f64], nir: &[f64]) -> Result<IndexArray> {
    apply_pairwise(IndexKind::RedEdgeNdvi, red, nir, |red, nir| {
        safe_normalized_difference(RED_EDGE_NIR_WEIGHT * nir, RED_EDGE_RED_WEIGHT * red)
    })
}

/// Compute one index from the bands of a sample
pub fn compute(kind: IndexKind, sample: &SpectralSample) -> Result<IndexArray> {
    match kind {
        IndexKind::Ndvi => ndvi(&sample.red, &sample.nir),
        IndexKind::Ndwi => ndwi(&sample.nir, &sample.swir),
        IndexKind::Mndwi => mndwi(&sample.green, &sample.swir),
        IndexKind::Ndsi => ndsi(&sample.swir, &sample.green),
        IndexKind::RedEdgeNdvi => red_edge_ndvi(&sample.red, &sample.nir),
    }
}

// ============================================================================
// Batch entry point
// ============================================================================

/// Compute every index whose required bands are present
///
/// Indices with a missing band are absent from the result, never defaulted.
pub fn compute_all(sample: &SpectralSample) -> Result<IndexSet> {
    compute_all_with_ndvi(sample, None)
}

/// Batch computation with an optional externally measured NDVI
///
/// When `measured_ndvi` is given, the NDVI array is that value replicated to
/// the sample's pixel count instead of being derived from red/nir.
pub fn compute_all_with_ndvi(sample: &SpectralSample, measured_ndvi: Option<f64>) -> Result<IndexSet> {
    sample.validate()?;

    let mut set = IndexSet::new();
    for kind in IndexKind::ALL {
        if kind == IndexKind::Ndvi {
            if let Some(value) = measured_ndvi {
                let n = sample.pixel_count();
                if n > 0 {
                    tracing::info!("Using measured NDVI value {:.3} for {} pixels", value, n);
                    set.insert(kind, IndexArray::filled(value, n));
                }
                continue;
            }
        }

        let bands_present = kind.required_bands().iter().all(|b: &Band| sample.has_band(*b));
        if !bands_present {
            tracing::debug!("Skipping {}: required bands missing", kind.label());
            continue;
        }

        let array = compute(kind, sample)?;
        if let Some(mean) = array.mean() {
            tracing::info!("{} calculated: mean = {:.3}", kind.label(), mean);
        }
        set.insert(kind, array);
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ndvi_formula() {
        let result = ndvi(&[0.05], &[0.65]).unwrap();
        assert_relative_eq!(result.values()[0], 0.6 / 0.7, epsilon = 1e-12);
        assert_relative_eq!(result.values()[0], 0.857, epsilon = 0.001);
    }

    #[test]
    fn test_zero_denominator_is_zero() {
        let result = ndvi(&[0.0, 0.2], &[0.0, 0.2]).unwrap();
        assert_eq!(result.values(), &[0.0, 0.0]);

        let result = ndsi(&[0.0], &[0.0]).unwrap();
        assert_eq!(result.values(), &[0.0]);
    }

    #[test]
    fn test_output_is_clamped() {
        // Negative reflectance pushes the raw ratio outside [-1, 1]
        let result = ndvi(&[-0.5], &[0.6]).unwrap();
        assert_relative_eq!(result.values()[0], 1.0);

        let result = ndwi(&[0.6], &[-0.9]).unwrap();
        assert_relative_eq!(result.values()[0], -1.0);
    }

    #[test]
    fn test_ndsi_and_mndwi_are_sign_flipped() {
        let green = [0.3, 0.1];
        let swir = [0.1, 0.4];
        let m = mndwi(&green, &swir).unwrap();
        let s = ndsi(&swir, &green).unwrap();
        for (a, b) in m.values().iter().zip(s.values()) {
            assert_relative_eq!(*a, -*b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_red_edge_weights() {
        let result = red_edge_ndvi(&[0.1], &[0.5]).unwrap();
        let expected = (1.1 * 0.5 - 0.9 * 0.1) / (1.1 * 0.5 + 0.9 * 0.1);
        assert_relative_eq!(result.values()[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_band_error() {
        let err = ndvi(&[], &[0.5]).unwrap_err();
        assert_eq!(err, SpectralError::MissingData { index: "ndvi", band: "red" });

        let err = ndwi(&[0.5], &[]).unwrap_err();
        assert_eq!(err, SpectralError::MissingData { index: "ndwi", band: "swir" });
    }

    #[test]
    fn test_length_mismatch_error() {
        let err = mndwi(&[0.1, 0.2], &[0.3]).unwrap_err();
        assert_eq!(err.kind(), "length_mismatch");
    }

    #[test]
    fn test_compute_all_skips_missing_indices() {
        let sample = SpectralSample::new(vec![0.1, 0.2], vec![], vec![0.6, 0.7], vec![]).unwrap();
        let set = compute_all(&sample).unwrap();
        assert!(set.contains(IndexKind::Ndvi));
        assert!(set.contains(IndexKind::RedEdgeNdvi));
        assert!(!set.contains(IndexKind::Ndwi));
        assert!(!set.contains(IndexKind::Mndwi));
        assert!(!set.contains(IndexKind::Ndsi));
        assert_eq!(set.names(), vec!["ndvi", "red_edge_ndvi"]);
    }

    #[test]
    fn test_compute_all_full_sample() {
        let sample = SpectralSample::new(
            vec![0.05, 0.06],
            vec![0.07, 0.08],
            vec![0.6, 0.7],
            vec![0.1, 0.12],
        )
        .unwrap();
        let set = compute_all(&sample).unwrap();
        assert_eq!(set.len(), 5);
        assert_eq!(set.len_of(IndexKind::Ndsi), 2);
    }

    #[test]
    fn test_measured_ndvi_override() {
        let sample = SpectralSample::new(vec![0.1; 4], vec![], vec![0.2; 4], vec![]).unwrap();
        let set = compute_all_with_ndvi(&sample, Some(0.72)).unwrap();
        let ndvi = set.get(IndexKind::Ndvi).unwrap();
        assert_eq!(ndvi.len(), 4);
        assert!(ndvi.values().iter().all(|v| (*v - 0.72).abs() < 1e-12));
    }

    #[test]
    fn test_measured_ndvi_not_fabricated_for_empty_sample() {
        let set = compute_all_with_ndvi(&SpectralSample::default(), Some(0.5)).unwrap();
        assert!(set.is_empty());
    }
}
