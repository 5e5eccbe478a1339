//! COSMOS query engine
//!
//! This crate implements the citation-aware multi-model query engine:
//! dispatching a question to one model as an incremental stream or to
//! several models as concurrent batch calls, extracting and renumbering
//! the source citations embedded in the returned text, and maintaining
//! the session's conversation log.

pub mod answer;
pub mod batch;
pub mod citation;
pub mod conversation;
pub mod dispatcher;
pub mod streaming;

// Re-export key types for convenience
pub use answer::{AnswerService, AnswerStream, BatchAnswer, HttpAnswerService, QueryRequest};
pub use batch::{BatchAggregator, ModelOutcome};
pub use citation::{Citation, CitationProcessor, ProcessedAnswer};
pub use conversation::{
    ConversationEvent, ConversationState, Message, PendingMessage, Role,
};
pub use dispatcher::QueryDispatcher;
pub use streaming::StreamConsumer;
