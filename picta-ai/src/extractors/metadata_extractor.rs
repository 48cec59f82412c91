//! Metadata Extractor
//!
//! Reads image geometry from the format header only; pixel data is never decoded.

use image::ImageReader;
use std::io::Cursor;
use tracing::debug;

use crate::error::AnalysisError;
use crate::types::{AnalysisStage, Dimensions, MetadataExtractor};

/// Header-only dimension reader backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageMetadataExtractor;

impl ImageMetadataExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for ImageMetadataExtractor {
    fn extract_dimensions(&self, image: &[u8]) -> Result<Dimensions, AnalysisError> {
        let reader = ImageReader::new(Cursor::new(image))
            .with_guessed_format()
            .map_err(|e| AnalysisError::decode(AnalysisStage::Metadata, e.to_string()))?;

        let format = reader.format().ok_or_else(|| {
            AnalysisError::decode(AnalysisStage::Metadata, "unrecognized image format")
        })?;

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| AnalysisError::decode(AnalysisStage::Metadata, e.to_string()))?;

        debug!(?format, width, height, "Read image dimensions");

        Dimensions::new(width, height).ok_or_else(|| {
            AnalysisError::decode(
                AnalysisStage::Metadata,
                format!("image reports empty geometry {}x{}", width, height),
            )
        })
    }
}
