//! COSMOS Common - Shared utilities and types
//!
//! This crate provides the common error type, configuration structs,
//! constants and domain types used across the COSMOS query engine.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use config::{EngineConfig, ServiceConfig};
pub use constants::*;
pub use error::{CosmosError, Result};
pub use types::{ModelTiming, SourceType};
