//! Incremental read loop for single-model mode
//!
//! One open text source, one pending message, one producer. Each decoded
//! chunk extends an internal accumulator and republishes it as the pending
//! content, so every publish is observable and publishes arrive in source
//! order. The loop is the only place in this mode that suspends repeatedly;
//! dropping the future stops it at the next suspension point with no
//! further writes.

use crate::answer::AnswerStream;
use crate::citation::CitationProcessor;
use crate::conversation::{ConversationState, PendingMessage};
use cosmos_common::{EngineConfig, Result, constants};
use futures_util::StreamExt;
use tracing::{debug, info, warn};

/// Drives one incremental response into the pending message
pub struct StreamConsumer<'a> {
    state: &'a ConversationState,
    processor: &'a CitationProcessor,
}

impl<'a> StreamConsumer<'a> {
    pub fn new(state: &'a ConversationState, processor: &'a CitationProcessor) -> Self {
        Self { state, processor }
    }

    /// Read `source` to completion, publishing into `handle`.
    ///
    /// On a mid-stream failure the pending content is replaced with a
    /// deterministic error string naming the model, then finalized; the
    /// error itself is absorbed here. On natural completion the accumulated
    /// text is citation-processed, published once more if that changed it,
    /// and finalized.
    pub async fn consume(
        &self,
        model: &str,
        mut source: AnswerStream,
        handle: &PendingMessage,
        config: &EngineConfig,
    ) -> Result<()> {
        let prefix = if config.prefix_model_name {
            format!("**{}**:\n", model)
        } else {
            String::new()
        };

        let mut accumulator = String::new();
        let mut publishes = 0u32;

        while let Some(item) = source.next().await {
            match item {
                Ok(chunk) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    accumulator.push_str(&chunk);
                    publishes += 1;
                    self.state
                        .update_content(handle, format!("{}{}", prefix, accumulator))
                        .await?;
                }
                Err(e) => {
                    warn!(model, error = %e, "stream failed mid-read");
                    self.state
                        .update_content(handle, format!("**{}**:\nError: {}", model, e))
                        .await?;
                    return self.state.finalize(handle).await;
                }
            }
        }

        debug!(model, publishes, chars = accumulator.len(), "stream complete");

        let processed = self.processor.process(&accumulator);
        let mut content = format!("{}{}", prefix, processed.text);
        if config.show_diagnostics {
            content.push_str(constants::STREAMED_NOTE);
        }
        // Skip a redundant publish when processing changed nothing
        if content != format!("{}{}", prefix, accumulator) {
            self.state.update_content(handle, content).await?;
        }
        self.state.set_citations(handle, processed.citations).await?;
        self.state.finalize(handle).await?;

        info!(model, "streamed answer finalized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ConversationEvent;
    use cosmos_common::CosmosError;

    fn chunk_stream(chunks: Vec<Result<&'static str>>) -> AnswerStream {
        Box::pin(tokio_stream::iter(
            chunks
                .into_iter()
                .map(|r| r.map(String::from))
                .collect::<Vec<_>>(),
        ))
    }

    #[tokio::test]
    async fn test_accumulation_publishes_prefix_extensions() {
        let state = ConversationState::new();
        let processor = CitationProcessor::new();
        let mut events = state.subscribe();
        let handle = state.create_pending().await.unwrap();

        let source = chunk_stream(vec![Ok("Hel"), Ok("lo "), Ok("world")]);
        StreamConsumer::new(&state, &processor)
            .consume("model-a", source, &handle, &EngineConfig::default())
            .await
            .unwrap();

        // Three publishes, each a strict prefix-extension of the previous
        let mut published = Vec::new();
        loop {
            match events.try_recv() {
                Ok(ConversationEvent::PendingUpdated { content, .. }) => published.push(content),
                Ok(_) => {}
                Err(_) => break,
            }
        }
        assert_eq!(published, vec!["Hel", "Hello ", "Hello world"]);
        for pair in published.windows(2) {
            assert!(pair[1].starts_with(&pair[0]));
            assert!(pair[1].len() > pair[0].len());
        }

        let messages = state.snapshot().await;
        let last = messages.last().unwrap();
        assert_eq!(last.content, "Hello world");
        assert!(last.finalized);
        assert!(last.citations.is_empty());
    }

    #[tokio::test]
    async fn test_citations_extracted_on_completion() {
        let state = ConversationState::new();
        let processor = CitationProcessor::new();
        let handle = state.create_pending().await.unwrap();

        let source = chunk_stream(vec![
            Ok("The answer [Source: url"),
            Ok(" example.com] is 42."),
        ]);
        StreamConsumer::new(&state, &processor)
            .consume("model-a", source, &handle, &EngineConfig::default())
            .await
            .unwrap();

        let messages = state.snapshot().await;
        let last = messages.last().unwrap();
        assert_eq!(last.citations.len(), 1);
        assert_eq!(last.citations[0].identifier, "example.com");
        assert!(last.content.contains("[[1]](#source-1)"));
        assert!(last.content.contains("**Sources:**"));
    }

    #[tokio::test]
    async fn test_failure_replaces_content_and_finalizes() {
        let state = ConversationState::new();
        let processor = CitationProcessor::new();
        let handle = state.create_pending().await.unwrap();

        let source = chunk_stream(vec![
            Ok("partial "),
            Err(CosmosError::Transport("connection reset".to_string())),
        ]);
        StreamConsumer::new(&state, &processor)
            .consume("model-a", source, &handle, &EngineConfig::default())
            .await
            .unwrap();

        let messages = state.snapshot().await;
        let last = messages.last().unwrap();
        assert_eq!(
            last.content,
            "**model-a**:\nError: transport error: connection reset"
        );
        assert!(last.finalized);
        assert!(!state.has_pending().await);
    }

    #[tokio::test]
    async fn test_diagnostics_appends_streamed_note() {
        let state = ConversationState::new();
        let processor = CitationProcessor::new();
        let handle = state.create_pending().await.unwrap();

        let config = EngineConfig {
            show_diagnostics: true,
            ..EngineConfig::default()
        };
        let source = chunk_stream(vec![Ok("done")]);
        StreamConsumer::new(&state, &processor)
            .consume("model-a", source, &handle, &config)
            .await
            .unwrap();

        let messages = state.snapshot().await;
        assert!(
            messages
                .last()
                .unwrap()
                .content
                .ends_with(constants::STREAMED_NOTE)
        );
    }

    #[tokio::test]
    async fn test_model_prefix_when_configured() {
        let state = ConversationState::new();
        let processor = CitationProcessor::new();
        let handle = state.create_pending().await.unwrap();

        let config = EngineConfig {
            prefix_model_name: true,
            ..EngineConfig::default()
        };
        let source = chunk_stream(vec![Ok("hi")]);
        StreamConsumer::new(&state, &processor)
            .consume("model-a", source, &handle, &config)
            .await
            .unwrap();

        let messages = state.snapshot().await;
        assert_eq!(messages.last().unwrap().content, "**model-a**:\nhi");
    }

    #[tokio::test]
    async fn test_empty_stream_finalizes_empty_message() {
        let state = ConversationState::new();
        let processor = CitationProcessor::new();
        let handle = state.create_pending().await.unwrap();

        let source = chunk_stream(vec![]);
        StreamConsumer::new(&state, &processor)
            .consume("model-a", source, &handle, &EngineConfig::default())
            .await
            .unwrap();

        let messages = state.snapshot().await;
        let last = messages.last().unwrap();
        assert_eq!(last.content, "");
        assert!(last.finalized);
    }
}
