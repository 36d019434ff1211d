//! Visualization sink
//!
//! Rendering lives outside the analysis core. The core resamples the field
//! onto a regular grid, hands each named grid to a [`VisualizationSink`], and
//! records only whether rendering succeeded.

use crate::error::{Result, SpectralError};
use crate::indices::safe_normalized_difference;
use crate::types::{Band, IndexKind, SpectralSample};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::RwLock;

pub const DEFAULT_GRID: (usize, usize) = (20, 20);

/// Opaque reference to a rendered artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactHandle(pub String);

/// Band and index rasters resampled from a pixel list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldGrid {
    pub rows: usize,
    pub cols: usize,
    /// Row-major index rasters keyed by index name
    pub indices: BTreeMap<&'static str, Vec<f64>>,
}

impl FieldGrid {
    /// Scatter band values onto a `rows x cols` grid and smooth with a 3x3 mean
    ///
    /// Missing bands use typical vegetated reflectances.
    pub fn resample(sample: &SpectralSample, (rows, cols): (usize, usize), seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut band_grid = |band: Band, fallback: f64| -> Vec<f64> {
            let values = sample.band(band);
            let raw: Vec<f64> = (0..rows * cols)
                .map(|_| values.choose(&mut rng).copied().unwrap_or(fallback))
                .collect();
            smooth(&raw, rows, cols)
        };

        let red = band_grid(Band::Red, 0.1);
        let green = band_grid(Band::Green, 0.15);
        let nir = band_grid(Band::Nir, 0.6);
        let swir = band_grid(Band::Swir, 0.3);

        let combine = |a: &[f64], b: &[f64]| -> Vec<f64> {
            a.iter().zip(b).map(|(x, y)| safe_normalized_difference(*x, *y)).collect()
        };

        let mut indices = BTreeMap::new();
        indices.insert(IndexKind::Ndvi.as_str(), combine(&nir, &red));
        indices.insert(IndexKind::Ndwi.as_str(), combine(&nir, &swir));
        indices.insert(IndexKind::Ndsi.as_str(), combine(&swir, &green));

        Self { rows, cols, indices }
    }

    pub fn index(&self, kind: IndexKind) -> Option<&[f64]> {
        self.indices.get(kind.as_str()).map(Vec::as_slice)
    }

    pub fn resolution(&self) -> String {
        format!("{}x{} pixels", self.rows, self.cols)
    }
}

fn smooth(grid: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut out = vec![0.0; grid.len()];
    for r in 0..rows {
        for c in 0..cols {
            let mut sum = 0.0;
            let mut n = 0.0;
            for rr in r.saturating_sub(1)..=(r + 1).min(rows - 1) {
                for cc in c.saturating_sub(1)..=(c + 1).min(cols - 1) {
                    sum += grid[rr * cols + cc];
                    n += 1.0;
                }
            }
            out[r * cols + c] = sum / n;
        }
    }
    out
}

/// Renders a named grid into an artifact
pub trait VisualizationSink: Send + Sync {
    fn render(&self, name: &str, grid: &FieldGrid) -> Result<ArtifactHandle>;
}

/// Outcome of one render request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<ArtifactHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Render every named artifact, recording failures instead of aborting
pub fn render_all(
    sink: &dyn VisualizationSink,
    names: &[&'static str],
    grid: &FieldGrid,
) -> BTreeMap<&'static str, ArtifactStatus> {
    names
        .iter()
        .map(|&name| {
            let status = match sink.render(name, grid) {
                Ok(handle) => ArtifactStatus { success: true, handle: Some(handle), error: None },
                Err(e) => {
                    tracing::warn!("Failed to render {}: {}", name, e);
                    ArtifactStatus { success: false, handle: None, error: Some(e.to_string()) }
                }
            };
            (name, status)
        })
        .collect()
}

/// Keeps rendered grids in memory; handles are `memory://<name>/<n>`
#[derive(Debug, Default)]
pub struct InMemorySink {
    artifacts: RwLock<Vec<(String, FieldGrid)>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VisualizationSink for InMemorySink {
    fn render(&self, name: &str, grid: &FieldGrid) -> Result<ArtifactHandle> {
        if grid.rows == 0 || grid.cols == 0 {
            return Err(SpectralError::Visualization(format!("{} has an empty grid", name)));
        }
        let mut artifacts = self
            .artifacts
            .write()
            .map_err(|e| SpectralError::Visualization(format!("Lock error: {}", e)))?;
        artifacts.push((name.to_string(), grid.clone()));
        Ok(ArtifactHandle(format!("memory://{}/{}", name, artifacts.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vegetated() -> SpectralSample {
        SpectralSample::new(vec![0.05, 0.06], vec![0.07, 0.08], vec![0.6, 0.7], vec![0.1, 0.12]).unwrap()
    }

    #[test]
    fn test_grid_shape_and_determinism() {
        let a = FieldGrid::resample(&vegetated(), (4, 5), 3);
        let b = FieldGrid::resample(&vegetated(), (4, 5), 3);
        assert_eq!(a, b);
        assert_eq!(a.index(IndexKind::Ndvi).unwrap().len(), 20);
        assert_eq!(a.resolution(), "4x5 pixels");
        assert!(a.index(IndexKind::Ndvi).unwrap().iter().all(|v| *v > 0.75 && *v < 0.9));
    }

    #[test]
    fn test_missing_bands_use_defaults() {
        let grid = FieldGrid::resample(&SpectralSample::default(), (2, 2), 0);
        // nir 0.6, red 0.1 → 0.5 / 0.7
        assert_relative_eq!(grid.index(IndexKind::Ndvi).unwrap()[0], 0.5 / 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_smooth_constant_grid_unchanged() {
        let out = smooth(&[2.0; 9], 3, 3);
        assert!(out.iter().all(|v| (*v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_render_all_records_failures() {
        let sink = InMemorySink::new();
        let grid = FieldGrid::resample(&vegetated(), (3, 3), 1);
        let status = render_all(&sink, &["ndvi_map", "health_zones"], &grid);
        assert!(status["ndvi_map"].success);
        assert_eq!(status["health_zones"].handle, Some(ArtifactHandle("memory://health_zones/2".into())));
        assert_eq!(sink.len(), 2);

        let empty = FieldGrid::resample(&vegetated(), (0, 0), 1);
        let status = render_all(&sink, &["ndvi_map"], &empty);
        assert!(!status["ndvi_map"].success);
        assert!(status["ndvi_map"].error.is_some());
    }
}
