//! Core Types and Trait Definitions for picta-ai
//!
//! Defines the data model of one image analysis and the capability traits the
//! orchestrator depends on:
//! - [`MetadataExtractor`] - image geometry (synchronous, CPU-bound)
//! - [`PaletteExtractor`] - dominant colors (synchronous, CPU-bound)
//! - [`Recognizer`] - remote object recognition (async, network-bound)
//! - [`RecordStore`] - persistence of the aggregate record (async)
//!
//! Serialized field names of [`AnalysisRecord`] are the stored/over-the-wire contract
//! (`filename`, `dimensions`, `dominantColors`, `objectRecognition`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::error::AnalysisError;

// ============================================================================
// Analysis Results
// ============================================================================

/// Pixel geometry of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Zero on either side is not a valid result
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            Some(Self { width, height })
        }
    }
}

/// A color in `#rrggbb` form
///
/// Deserialization goes through [`ColorSwatch::parse`], so stored or received values
/// are held to the same format as extracted ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColorSwatch(String);

impl ColorSwatch {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("#{:02x}{:02x}{:02x}", r, g, b))
    }

    /// Parse `#rrggbb` (either case); normalized to lowercase
    pub fn parse(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(format!("#{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ColorSwatch {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
            .ok_or_else(|| format!("invalid color swatch {:?}, expected #rrggbb", value))
    }
}

impl From<ColorSwatch> for String {
    fn from(swatch: ColorSwatch) -> Self {
        swatch.0
    }
}

impl fmt::Display for ColorSwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Perceptual palette roles, in result order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteSlot {
    Vibrant,
    LightVibrant,
    DarkVibrant,
    Muted,
    LightMuted,
    DarkMuted,
}

impl PaletteSlot {
    pub const ALL: [PaletteSlot; 6] = [
        PaletteSlot::Vibrant,
        PaletteSlot::LightVibrant,
        PaletteSlot::DarkVibrant,
        PaletteSlot::Muted,
        PaletteSlot::LightMuted,
        PaletteSlot::DarkMuted,
    ];
}

/// Resolved slots in slot order; unresolved slots are absent
pub type PaletteResult = Vec<ColorSwatch>;

/// One (label, confidence) pair from the recognition model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionCandidate {
    pub label: String,
    /// Model confidence (0.0-1.0)
    pub confidence: f32,
}

impl RecognitionCandidate {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Candidates exactly as ranked by the remote model
pub type RecognitionResult = Vec<RecognitionCandidate>;

/// Labels that passed the confidence filter, in model ranking order
pub type FilteredLabels = Vec<String>;

// ============================================================================
// Aggregate Record
// ============================================================================

/// Aggregate record before the store assigns an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalysisRecord {
    pub filename: String,
    pub dimensions: Dimensions,
    pub dominant_colors: Vec<ColorSwatch>,
    pub object_recognition: FilteredLabels,
}

impl NewAnalysisRecord {
    /// Attach the identity assigned by the store
    pub fn with_id(self, id: Uuid) -> AnalysisRecord {
        AnalysisRecord {
            id,
            filename: self.filename,
            dimensions: self.dimensions,
            dominant_colors: self.dominant_colors,
            object_recognition: self.object_recognition,
        }
    }
}

/// Persisted aggregate record (write-once)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub filename: String,
    pub dimensions: Dimensions,
    pub dominant_colors: Vec<ColorSwatch>,
    pub object_recognition: FilteredLabels,
}

/// Pipeline stage, used to attribute failures and degradations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStage {
    Metadata,
    Palette,
    Recognition,
    Persistence,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisStage::Metadata => "metadata",
            AnalysisStage::Palette => "palette",
            AnalysisStage::Recognition => "recognition",
            AnalysisStage::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

/// A non-critical stage failed and its field was replaced by an empty container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Degradation {
    pub stage: AnalysisStage,
    pub reason: String,
}

/// Result of one successful `analyze` call
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// The persisted record
    pub record: AnalysisRecord,
    /// Stages whose output was substituted (empty when everything succeeded)
    pub degraded: Vec<Degradation>,
}

impl AnalysisOutcome {
    pub fn is_degraded(&self, stage: AnalysisStage) -> bool {
        self.degraded.iter().any(|d| d.stage == stage)
    }
}

// ============================================================================
// Capability Traits
// ============================================================================

/// Reads pixel geometry from image bytes
///
/// Implementations should read only as much of the image as the format needs
/// to report its size.
pub trait MetadataExtractor: Send + Sync {
    fn extract_dimensions(&self, image: &[u8]) -> Result<Dimensions, AnalysisError>;
}

/// Computes representative colors from image pixels
pub trait PaletteExtractor: Send + Sync {
    fn extract_palette(&self, image: &[u8]) -> Result<PaletteResult, AnalysisError>;
}

/// Something that recognizes objects/concepts in an image
///
/// # Example
/// ```rust,ignore
/// let candidates = recognizer.recognize(&bytes, Duration::from_secs(10)).await?;
/// let labels = filter_labels(&candidates, DEFAULT_CONFIDENCE_THRESHOLD);
/// ```
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    /// Name for logging
    fn name(&self) -> &'static str;

    /// Return the model's raw, unfiltered candidates
    ///
    /// # Errors
    /// - `RecognitionTimeout` when no answer arrived within `timeout`
    /// - `RecognitionUnavailable` on transport, status, or body failures
    async fn recognize(
        &self,
        image: &[u8],
        timeout: Duration,
    ) -> Result<RecognitionResult, AnalysisError>;
}

/// Opaque create/read store for aggregate records
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a record and return it with its assigned identity
    async fn save(&self, record: NewAnalysisRecord) -> Result<AnalysisRecord, AnalysisError>;

    /// Read a previously saved record
    async fn get(&self, id: Uuid) -> Result<Option<AnalysisRecord>, AnalysisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_reject_zero() {
        assert!(Dimensions::new(0, 10).is_none());
        assert!(Dimensions::new(10, 0).is_none());
        assert_eq!(
            Dimensions::new(640, 480),
            Some(Dimensions {
                width: 640,
                height: 480
            })
        );
    }

    #[test]
    fn test_color_swatch_hex_format() {
        assert_eq!(ColorSwatch::from_rgb(255, 0, 16).as_str(), "#ff0010");
        assert_eq!(ColorSwatch::parse("#A0B1C2").unwrap().as_str(), "#a0b1c2");
        assert!(ColorSwatch::parse("A0B1C2").is_none());
        assert!(ColorSwatch::parse("#A0B1C").is_none());
        assert!(ColorSwatch::parse("#GGGGGG").is_none());
    }

    #[test]
    fn test_color_swatch_deserialize_validates() {
        let swatch: ColorSwatch = serde_json::from_str("\"#A0B1C2\"").unwrap();
        assert_eq!(swatch.as_str(), "#a0b1c2");

        for bad in ["\"#GGGGGG\"", "\"red\"", "\"#fff\"", "\"\""] {
            assert!(
                serde_json::from_str::<ColorSwatch>(bad).is_err(),
                "{} accepted",
                bad
            );
        }

        assert_eq!(
            serde_json::to_string(&ColorSwatch::from_rgb(0, 0, 255)).unwrap(),
            "\"#0000ff\""
        );
    }

    #[test]
    fn test_record_wire_field_names() {
        let record = NewAnalysisRecord {
            filename: "cat.png".to_string(),
            dimensions: Dimensions {
                width: 2,
                height: 3,
            },
            dominant_colors: vec![ColorSwatch::from_rgb(1, 2, 3)],
            object_recognition: vec!["cat".to_string()],
        }
        .with_id(Uuid::nil());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["filename"], "cat.png");
        assert_eq!(json["dimensions"]["width"], 2);
        assert_eq!(json["dimensions"]["height"], 3);
        assert_eq!(json["dominantColors"][0], "#010203");
        assert_eq!(json["objectRecognition"][0], "cat");
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [
            AnalysisStage::Metadata,
            AnalysisStage::Palette,
            AnalysisStage::Recognition,
            AnalysisStage::Persistence,
        ] {
            let json = serde_json::to_value(stage).unwrap();
            assert_eq!(json, stage.to_string());
        }
    }
}
