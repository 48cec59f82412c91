//! Image Analyzers
//!
//! Three independent analyzers, each behind a capability trait from `types`:
//! 1. **metadata_extractor** - header-only image geometry
//! 2. **palette_extractor** - dominant colors by quantization
//! 3. **recognition_client** - remote object recognition
//!
//! Analyzers share nothing but a read-only view of the image bytes, so the
//! orchestrator runs them concurrently without locking.

pub mod metadata_extractor;
pub mod palette_extractor;
pub mod recognition_client;

pub use metadata_extractor::ImageMetadataExtractor;
pub use palette_extractor::VibrantPaletteExtractor;
pub use recognition_client::RemoteRecognitionClient;
