//! Common domain types used across COSMOS components

use serde::{Deserialize, Serialize};

/// Kind of retrieval source a citation points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Pdf,
    Image,
    Url,
    Youtube,
}

impl SourceType {
    /// Every known source type, in a fixed order
    pub const ALL: [SourceType; 4] = [
        SourceType::Pdf,
        SourceType::Image,
        SourceType::Url,
        SourceType::Youtube,
    ];

    /// The label this type carries inside a citation marker.
    ///
    /// The label set is case-sensitive and closed; anything else in marker
    /// position is malformed.
    pub fn type_label(&self) -> &'static str {
        match self {
            SourceType::Pdf => "PDF document",
            SourceType::Image => "image",
            SourceType::Url => "url",
            SourceType::Youtube => "youtube",
        }
    }

    /// Parse a marker type-label back into a source type
    pub fn from_type_label(label: &str) -> Option<Self> {
        match label {
            "PDF document" => Some(SourceType::Pdf),
            "image" => Some(SourceType::Image),
            "url" => Some(SourceType::Url),
            "youtube" => Some(SourceType::Youtube),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Pdf => write!(f, "pdf"),
            SourceType::Image => write!(f, "image"),
            SourceType::Url => write!(f, "url"),
            SourceType::Youtube => write!(f, "youtube"),
        }
    }
}

/// Per-model timing breakdown reported by the Answer Service.
///
/// Diagnostic only; absence never affects merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTiming {
    pub model_name: String,
    pub retrieval_seconds: f64,
    pub generation_seconds: f64,
    pub total_seconds: f64,
}
