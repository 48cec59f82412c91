//! # Picta Common Library
//!
//! Shared code for the picta services including:
//! - Error type
//! - Configuration loading and root folder resolution
//! - Database pool initialization

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
