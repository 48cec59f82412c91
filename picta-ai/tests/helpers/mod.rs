//! Test Helper Utilities
//!
//! Shared utilities for testing picta-ai

#![allow(dead_code)]

pub mod image_generator;
pub mod mocks;

pub use image_generator::{generate_test_jpeg, generate_test_png, generate_two_tone_png};
pub use mocks::{
    create_test_store, FailingMetadata, FailingPalette, FailingRecognizer, FailingStore,
    FixedRecognizer, HangingRecognizer, MemoryStore, PanickingPalette,
};
