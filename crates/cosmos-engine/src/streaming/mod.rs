//! Single-model streaming consumption
//!
//! This module drives one incremental Answer Service read loop and publishes
//! partial content into the conversation as it arrives.

pub mod consumer;

// Re-export key types for convenience
pub use consumer::StreamConsumer;
