//! Common constants used across COSMOS

/// Default model backend when the caller does not pick one
pub const DEFAULT_MODEL_NAME: &str = "mixtral-8x7b-32768";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default Answer Service base URL
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Greeting placed in the log on creation and after every reset
pub const SYSTEM_GREETING: &str =
    "Hello! I'm COSMOS. Ask me anything about the sources you've added.";

/// Trailing note appended to streamed answers when diagnostics are on
pub const STREAMED_NOTE: &str = "\n\n_Response streamed incrementally._";

/// Heading of the appended citation list
pub const SOURCES_HEADER: &str = "**Sources:**";

/// Common model identifiers
pub mod models {
    pub const MIXTRAL_8X7B: &str = "mixtral-8x7b-32768";
    pub const LLAMA3_70B: &str = "llama3-70b-8192";
    pub const LLAMA3_8B: &str = "llama3-8b-8192";
    pub const GEMMA_7B: &str = "gemma-7b-it";
}

/// Default timeout values in seconds
pub mod timeouts {
    pub const DEFAULT_HTTP_TIMEOUT: u64 = 30;
}
