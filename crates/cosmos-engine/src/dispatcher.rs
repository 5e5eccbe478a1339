//! Query dispatch
//!
//! The dispatcher is the engine's entry point: it validates the request,
//! opens the turn, and selects stream mode (one model) or batch mode (two
//! or more). It also exposes the read-only surface the presentation layer
//! is allowed to see.

use crate::answer::{AnswerService, QueryRequest};
use crate::batch::BatchAggregator;
use crate::citation::CitationProcessor;
use crate::conversation::{ConversationEvent, ConversationState, Message, PendingMessage};
use crate::streaming::StreamConsumer;
use cosmos_common::{CosmosError, EngineConfig, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{info, warn};
use uuid::Uuid;

/// Top-level query engine facade
pub struct QueryDispatcher {
    service: Arc<dyn AnswerService>,
    state: Arc<ConversationState>,
    processor: CitationProcessor,
    config: EngineConfig,
    /// Serializes submission setup so two submits cannot both pass the
    /// pending check
    submit_guard: Mutex<()>,
}

impl QueryDispatcher {
    pub fn new(service: Arc<dyn AnswerService>, config: EngineConfig) -> Self {
        Self {
            service,
            state: Arc::new(ConversationState::new()),
            processor: CitationProcessor::new(),
            config,
            submit_guard: Mutex::new(()),
        }
    }

    /// Submit one query and drive it to a finalized assistant message.
    ///
    /// Rejects with [`CosmosError::Concurrency`] before any network call if
    /// a turn is already in flight, and with [`CosmosError::Config`] if no
    /// model is selected. Returns the finalized message's id.
    pub async fn submit(&self, request: QueryRequest) -> Result<Uuid> {
        if request.selected_models.is_empty() {
            return Err(CosmosError::Config(
                "at least one model must be selected".to_string(),
            ));
        }

        let handle = {
            let _guard = self.submit_guard.lock().await;
            if self.state.has_pending().await {
                return Err(CosmosError::Concurrency(
                    "a response is already in flight for this conversation".to_string(),
                ));
            }
            self.state.append(Message::user(&request.text)).await;
            self.state.create_pending().await?
        };

        info!(
            models = request.selected_models.len(),
            "submitting query"
        );

        if request.selected_models.len() == 1 {
            self.run_stream(&request, &handle).await?;
        } else {
            self.run_batch(&request, &handle).await?;
        }
        Ok(handle.id())
    }

    async fn run_stream(&self, request: &QueryRequest, handle: &PendingMessage) -> Result<()> {
        let model = &request.selected_models[0];
        match self.service.stream_query(request, model).await {
            Ok(source) => {
                StreamConsumer::new(&self.state, &self.processor)
                    .consume(model, source, handle, &self.config)
                    .await
            }
            Err(e) => {
                // Opening the stream failed; same terminal shape as a
                // mid-stream failure
                warn!(%model, error = %e, "could not open stream");
                self.state
                    .update_content(handle, format!("**{}**:\nError: {}", model, e))
                    .await?;
                self.state.finalize(handle).await
            }
        }
    }

    async fn run_batch(&self, request: &QueryRequest, handle: &PendingMessage) -> Result<()> {
        let processed = BatchAggregator::new(&self.service, &self.processor)
            .run(request, self.config.show_diagnostics)
            .await;

        // Single writer: the merged message is written once, after the join
        self.state.update_content(handle, processed.text).await?;
        self.state.set_citations(handle, processed.citations).await?;
        self.state.finalize(handle).await
    }

    /// Clone of the conversation log
    pub async fn snapshot(&self) -> Vec<Message> {
        self.state.snapshot().await
    }

    /// Subscribe to conversation change events
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.state.subscribe()
    }

    /// Drop the whole conversation and start over with a fresh greeting
    pub async fn reset(&self) {
        self.state.reset().await
    }
}
