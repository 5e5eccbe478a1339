//! Citation extraction and renumbering
//!
//! This module turns raw Answer Service text with embedded source markers
//! into display text with stable, navigable citation numbers.

pub mod processor;

// Re-export key types for convenience
pub use processor::{Citation, CitationProcessor, ProcessedAnswer};
