//! Conversation state
//!
//! The log is append-only except for the single current pending message:
//! exactly one assistant message per turn is mutable, everything else is
//! frozen. Every externally visible change is also broadcast as an event so
//! a UI can follow streaming updates without polling.

use crate::citation::Citation;
use chrono::{DateTime, Utc};
use cosmos_common::{CosmosError, Result, constants};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry in the conversation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Log-local identity; carries no ordering semantics
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    /// Citations extracted from the finalized content
    pub citations: Vec<Citation>,
    /// Once true, the message never changes again
    pub finalized: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String, finalized: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            citations: Vec::new(),
            finalized,
            created_at: Utc::now(),
        }
    }

    /// A finalized user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), true)
    }

    fn system_greeting() -> Self {
        Self::new(Role::System, constants::SYSTEM_GREETING.to_string(), true)
    }
}

/// Handle to the single mutable assistant message of the current turn.
///
/// Only the driver that created the pending message holds its handle, which
/// is what makes it the sole writer for the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMessage {
    id: Uuid,
}

impl PendingMessage {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Broadcast notification of a log change
#[derive(Debug, Clone)]
pub enum ConversationEvent {
    /// A finalized message was appended
    Appended { id: Uuid },
    /// A new pending assistant message opened the turn
    PendingCreated { id: Uuid },
    /// The pending message's content was republished
    PendingUpdated { id: Uuid, content: String },
    /// The turn's message became immutable
    Finalized { id: Uuid },
    /// The log was replaced with a fresh greeting
    Reset,
}

struct ConversationLog {
    messages: Vec<Message>,
    pending: Option<Uuid>,
}

/// Owner of the ordered message log, mutated only through the operations
/// below.
pub struct ConversationState {
    log: RwLock<ConversationLog>,
    events: broadcast::Sender<ConversationEvent>,
}

impl ConversationState {
    /// Create a log holding the system greeting
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            log: RwLock::new(ConversationLog {
                messages: vec![Message::system_greeting()],
                pending: None,
            }),
            events,
        }
    }

    /// Append a finalized message to the log
    pub async fn append(&self, mut message: Message) {
        message.finalized = true;
        let id = message.id;
        self.log.write().await.messages.push(message);
        let _ = self.events.send(ConversationEvent::Appended { id });
    }

    /// Open the turn's pending assistant message and return its handle.
    ///
    /// Fails if a pending message already exists; there is never more than
    /// one per conversation.
    pub async fn create_pending(&self) -> Result<PendingMessage> {
        let mut log = self.log.write().await;
        if log.pending.is_some() {
            return Err(CosmosError::Concurrency(
                "a pending assistant message already exists".to_string(),
            ));
        }

        let message = Message::new(Role::Assistant, String::new(), false);
        let id = message.id;
        log.messages.push(message);
        log.pending = Some(id);
        drop(log);

        debug!(%id, "opened pending assistant message");
        let _ = self.events.send(ConversationEvent::PendingCreated { id });
        Ok(PendingMessage { id })
    }

    /// Overwrite the referenced message's content.
    ///
    /// Each call is a discrete, externally observable publish.
    pub async fn update_content(
        &self,
        handle: &PendingMessage,
        content: impl Into<String>,
    ) -> Result<()> {
        let content = content.into();
        let mut log = self.log.write().await;
        let message = Self::writable(&mut log, handle)?;
        message.content = content.clone();
        drop(log);

        let _ = self.events.send(ConversationEvent::PendingUpdated {
            id: handle.id,
            content,
        });
        Ok(())
    }

    /// Attach the extracted citations to the referenced message
    pub async fn set_citations(
        &self,
        handle: &PendingMessage,
        citations: Vec<Citation>,
    ) -> Result<()> {
        let mut log = self.log.write().await;
        let message = Self::writable(&mut log, handle)?;
        message.citations = citations;
        Ok(())
    }

    /// Mark the referenced message immutable. Permitted exactly once.
    pub async fn finalize(&self, handle: &PendingMessage) -> Result<()> {
        let mut log = self.log.write().await;
        let message = Self::writable(&mut log, handle)?;
        message.finalized = true;
        if log.pending == Some(handle.id) {
            log.pending = None;
        }
        drop(log);

        debug!(id = %handle.id, "finalized assistant message");
        let _ = self.events.send(ConversationEvent::Finalized { id: handle.id });
        Ok(())
    }

    /// Replace the entire log with a single fresh system greeting
    pub async fn reset(&self) {
        let mut log = self.log.write().await;
        log.messages = vec![Message::system_greeting()];
        log.pending = None;
        drop(log);

        debug!("conversation reset");
        let _ = self.events.send(ConversationEvent::Reset);
    }

    /// Clone of the current log
    pub async fn snapshot(&self) -> Vec<Message> {
        self.log.read().await.messages.clone()
    }

    /// Whether a turn is currently in flight
    pub async fn has_pending(&self) -> bool {
        self.log.read().await.pending.is_some()
    }

    /// Subscribe to log-change events.
    ///
    /// Delivery is best-effort: a lagging receiver misses events, the log
    /// itself is the source of truth.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    fn writable<'a>(
        log: &'a mut ConversationLog,
        handle: &PendingMessage,
    ) -> Result<&'a mut Message> {
        let message = log
            .messages
            .iter_mut()
            .find(|m| m.id == handle.id)
            .ok_or_else(|| {
                CosmosError::Concurrency("message handle does not refer to this log".to_string())
            })?;
        if message.finalized {
            return Err(CosmosError::Concurrency(
                "message is already finalized".to_string(),
            ));
        }
        Ok(message)
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}
