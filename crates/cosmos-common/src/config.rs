//! Configuration types for the COSMOS query engine

use crate::constants;
use serde::{Deserialize, Serialize};

/// Engine-level behavior switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model used when a request does not select any explicitly
    pub default_model: String,
    /// Sampling temperature used when a request does not carry one
    pub default_temperature: f32,
    /// Emit timing footnotes and the streamed-response trailing note
    pub show_diagnostics: bool,
    /// Prefix single-model streamed answers with the model's name
    pub prefix_model_name: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_model: constants::DEFAULT_MODEL_NAME.to_string(),
            default_temperature: constants::DEFAULT_TEMPERATURE,
            show_diagnostics: false,
            prefix_model_name: false,
        }
    }
}

/// Answer Service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the Answer Service API, without a trailing slash
    pub base_url: String,
    /// Per-request timeout in seconds. `None` leaves calls unbounded; the
    /// engine itself never imposes a timeout, so streamed responses longer
    /// than any configured value here will be cut off by the transport.
    pub timeout_seconds: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_API_BASE_URL.to_string(),
            timeout_seconds: None,
        }
    }
}
