//! Conversation log management
//!
//! This module owns the session's ordered message log and the pending-message
//! protocol that serializes assistant turns.

pub mod state;

// Re-export key types for convenience
pub use state::{ConversationEvent, ConversationState, Message, PendingMessage, Role};
