//! Crop types recognised by the assessors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Crop grown in a field
///
/// Crops without a dedicated pest table fall into `Other`, which keeps the
/// caller's name for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CropType {
    Rice,
    Wheat,
    Cotton,
    Sugarcane,
    Maize,
    Other(String),
}

impl CropType {
    /// Case-insensitive parse; unknown names become `Other`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "rice" => CropType::Rice,
            "wheat" => CropType::Wheat,
            "cotton" => CropType::Cotton,
            "sugarcane" => CropType::Sugarcane,
            "maize" => CropType::Maize,
            other => CropType::Other(other.to_string()),
        }
    }

    /// Lowercase key used for threshold lookup
    pub fn as_str(&self) -> &str {
        match self {
            CropType::Rice => "rice",
            CropType::Wheat => "wheat",
            CropType::Cotton => "cotton",
            CropType::Sugarcane => "sugarcane",
            CropType::Maize => "maize",
            CropType::Other(name) => name,
        }
    }
}

impl Default for CropType {
    fn default() -> Self {
        CropType::Other("general".to_string())
    }
}

impl fmt::Display for CropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for CropType {
    fn from(name: String) -> Self {
        CropType::parse(&name)
    }
}

impl From<CropType> for String {
    fn from(crop: CropType) -> Self {
        crop.as_str().to_string()
    }
}
