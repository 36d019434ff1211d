//! Index Interpretation
//!
//! Maps one representative scalar (normally the mean of an index array) to a
//! categorical judgment: status, description, score, display color and
//! confidence.
//!
//! Each index owns a fixed threshold table evaluated top-down, first match
//! wins:
//!
//! | Index | Cascade |
//! |---|---|
//! | NDVI | <0 Poor(0), <0.2 Poor(20), <0.4 Moderate(50), <0.6 Good(75), else Excellent(90) |
//! | NDWI | >0.3 High(90), >0.1 Moderate(70), >-0.1 Low(40), else None(10) |
//! | NDSI | >0.4 Snow/Ice(90), >0.1 Possible(60), >-0.1 No Snow(20), else Vegetation/Water(5) |
//!
//! Confidence is clamped to [60, 95]. A value that cannot be interpreted
//! (non-finite) yields the neutral placeholder instead of an error.

use crate::utils::statistics::round_to;
use crate::types::IndexKind;
use serde::Serialize;

const MIN_CONFIDENCE: f64 = 60.0;
const MAX_CONFIDENCE: f64 = 95.0;
const PLACEHOLDER_COLOR: &str = "#888888";

/// Categorical status across all interpreted indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InterpretationStatus {
    // NDVI
    Poor,
    Moderate,
    Good,
    Excellent,
    // NDWI
    HighWater,
    ModerateWater,
    LowWater,
    NoWater,
    // NDSI
    SnowIce,
    PossibleSnow,
    NoSnow,
    VegetationWater,
    /// Interpretation failed
    Unknown,
}

impl InterpretationStatus {
    pub fn display_text(&self) -> &'static str {
        match self {
            InterpretationStatus::Poor => "Poor",
            InterpretationStatus::Moderate => "Moderate",
            InterpretationStatus::Good => "Good",
            InterpretationStatus::Excellent => "Excellent",
            InterpretationStatus::HighWater => "High Water Content",
            InterpretationStatus::ModerateWater => "Moderate Water Content",
            InterpretationStatus::LowWater => "Low Water Content",
            InterpretationStatus::NoWater => "No Water",
            InterpretationStatus::SnowIce => "Snow/Ice Present",
            InterpretationStatus::PossibleSnow => "Possible Snow/Ice",
            InterpretationStatus::NoSnow => "No Snow",
            InterpretationStatus::VegetationWater => "Vegetation/Water",
            InterpretationStatus::Unknown => "Unknown",
        }
    }
}

/// Judgment derived from a single index scalar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub index: IndexKind,
    /// Input scalar, rounded to 3 decimals
    pub value: f64,
    pub status: InterpretationStatus,
    pub status_text: &'static str,
    pub description: &'static str,
    /// 0-100
    pub score: f64,
    pub color: &'static str,
    /// 0-100
    pub confidence: f64,
}

/// One row of a threshold table
struct Band {
    status: InterpretationStatus,
    description: &'static str,
    score: f64,
    color: &'static str,
}

impl Interpretation {
    fn from_band(index: IndexKind, value: f64, band: Band, confidence_basis: f64) -> Self {
        Self {
            index,
            value: round_to(value, 3),
            status: band.status,
            status_text: band.status.display_text(),
            description: band.description,
            score: band.score,
            color: band.color,
            confidence: clamp_confidence(confidence_basis),
        }
    }

    /// Neutral placeholder returned when interpretation fails
    pub fn placeholder(index: IndexKind, value: f64) -> Self {
        Self {
            index,
            value,
            status: InterpretationStatus::Unknown,
            status_text: InterpretationStatus::Unknown.display_text(),
            description: match index {
                IndexKind::Ndwi => "Error interpreting NDWI value",
                IndexKind::Ndsi => "Error interpreting NDSI value",
                _ => "Error interpreting NDVI value",
            },
            score: 50.0,
            color: PLACEHOLDER_COLOR,
            confidence: 50.0,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.status == InterpretationStatus::Unknown
    }
}

fn clamp_confidence(basis: f64) -> f64 {
    basis.round().clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

// ============================================================================
// Per-index tables
// ============================================================================

pub fn interpret_ndvi(value: f64) -> Interpretation {
    if !value.is_finite() {
        tracing::warn!("Cannot interpret NDVI value {}", value);
        return Interpretation::placeholder(IndexKind::Ndvi, value);
    }

    let band = if value < 0.0 {
        Band {
            status: InterpretationStatus::Poor,
            description: "No vegetation or stressed vegetation",
            score: 0.0,
            color: "#FF4444",
        }
    } else if value < 0.2 {
        Band {
            status: InterpretationStatus::Poor,
            description: "Sparse vegetation or bare soil",
            score: 20.0,
            color: "#FF6644",
        }
    } else if value < 0.4 {
        Band {
            status: InterpretationStatus::Moderate,
            description: "Moderate vegetation density",
            score: 50.0,
            color: "#FFAA44",
        }
    } else if value < 0.6 {
        Band {
            status: InterpretationStatus::Good,
            description: "Healthy vegetation",
            score: 75.0,
            color: "#88CC44",
        }
    } else {
        Band {
            status: InterpretationStatus::Excellent,
            description: "Dense, very healthy vegetation",
            score: 90.0,
            color: "#44AA44",
        }
    };

    let score = band.score;
    Interpretation::from_band(IndexKind::Ndvi, value, band, score)
}

pub fn interpret_ndwi(value: f64) -> Interpretation {
    if !value.is_finite() {
        tracing::warn!("Cannot interpret NDWI value {}", value);
        return Interpretation::placeholder(IndexKind::Ndwi, value);
    }

    let band = if value > 0.3 {
        Band {
            status: InterpretationStatus::HighWater,
            description: "Strong water presence or very moist vegetation",
            score: 90.0,
            color: "#0077BE",
        }
    } else if value > 0.1 {
        Band {
            status: InterpretationStatus::ModerateWater,
            description: "Water bodies or moist vegetation",
            score: 70.0,
            color: "#4A9FDB",
        }
    } else if value > -0.1 {
        Band {
            status: InterpretationStatus::LowWater,
            description: "Slightly moist soil or sparse vegetation",
            score: 40.0,
            color: "#87CEEB",
        }
    } else {
        Band {
            status: InterpretationStatus::NoWater,
            description: "Dry vegetation, bare soil, or built-up areas",
            score: 10.0,
            color: "#8B4513",
        }
    };

    Interpretation::from_band(IndexKind::Ndwi, value, band, value.abs() * 100.0)
}

pub fn interpret_ndsi(value: f64) -> Interpretation {
    if !value.is_finite() {
        tracing::warn!("Cannot interpret NDSI value {}", value);
        return Interpretation::placeholder(IndexKind::Ndsi, value);
    }

    let band = if value > 0.4 {
        Band {
            status: InterpretationStatus::SnowIce,
            description: "Strong snow or ice cover",
            score: 90.0,
            color: "#FFFFFF",
        }
    } else if value > 0.1 {
        Band {
            status: InterpretationStatus::PossibleSnow,
            description: "Light snow cover or mixed snow-vegetation",
            score: 60.0,
            color: "#F0F8FF",
        }
    } else if value > -0.1 {
        Band {
            status: InterpretationStatus::NoSnow,
            description: "Clear ground or sparse vegetation",
            score: 20.0,
            color: "#90EE90",
        }
    } else {
        Band {
            status: InterpretationStatus::VegetationWater,
            description: "Vegetation or water bodies (no snow)",
            score: 5.0,
            color: "#228B22",
        }
    };

    Interpretation::from_band(IndexKind::Ndsi, value, band, value.abs() * 100.0)
}

/// Interpret a scalar for any index that owns a threshold table
///
/// Returns `None` for MNDWI and RE-NDVI, which are reported through
/// statistics only.
pub fn interpret(kind: IndexKind, value: f64) -> Option<Interpretation> {
    match kind {
        IndexKind::Ndvi => Some(interpret_ndvi(value)),
        IndexKind::Ndwi => Some(interpret_ndwi(value)),
        IndexKind::Ndsi => Some(interpret_ndsi(value)),
        IndexKind::Mndwi | IndexKind::RedEdgeNdvi => None,
    }
}
