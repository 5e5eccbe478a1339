//! Answer Service client
//!
//! The Answer Service is the retrieval-augmented backend that turns a
//! question into model output. This module defines the two call shapes the
//! engine needs from it (one incremental, one batch) and an HTTP
//! implementation against the COSMOS REST API.

use async_trait::async_trait;
use cosmos_common::{CosmosError, ModelTiming, Result, ServiceConfig, SourceType, constants};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// Incremental text source returned by [`AnswerService::stream_query`].
///
/// Yields decoded text chunks in arrival order; ends at end-of-stream or
/// after one error item.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// One logical query as submitted by the caller.
///
/// All inputs travel here explicitly; the engine keeps no ambient settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The user's question
    pub text: String,
    /// Model backends to ask, in the order their answers should appear
    pub selected_models: Vec<String>,
    /// Sampling temperature forwarded to every model
    pub temperature: f32,
    /// Source types retrieval may draw from
    pub source_filters: Vec<SourceType>,
}

impl QueryRequest {
    /// Create a request with the default temperature and all source types
    /// enabled
    pub fn new(text: impl Into<String>, selected_models: Vec<String>) -> Self {
        Self {
            text: text.into(),
            selected_models,
            temperature: constants::DEFAULT_TEMPERATURE,
            source_filters: SourceType::ALL.to_vec(),
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Restrict retrieval to the given source types
    pub fn with_source_filters(mut self, source_filters: Vec<SourceType>) -> Self {
        self.source_filters = source_filters;
        self
    }
}

/// A settled batch call: the answer text plus an optional timing breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAnswer {
    pub answer: String,
    pub timing: Option<ModelTiming>,
}

/// The two call shapes the engine uses to reach the Answer Service
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// Open an incremental text source for one model.
    ///
    /// The stream terminates at end-of-stream; a failure surfaces as one
    /// `Err` item.
    async fn stream_query(&self, request: &QueryRequest, model: &str) -> Result<AnswerStream>;

    /// Ask one model for a complete answer.
    ///
    /// A failure the service reports explicitly maps to
    /// [`CosmosError::Service`]; connection problems map to
    /// [`CosmosError::Transport`].
    async fn batch_query(&self, request: &QueryRequest, model: &str) -> Result<BatchAnswer>;
}

/// JSON body for both query endpoints
#[derive(Serialize)]
struct QueryPayload<'a> {
    query: &'a str,
    model_name: &'a str,
    temperature: f32,
    filter_sources: HashMap<String, bool>,
}

/// JSON reply of the batch endpoint
#[derive(Deserialize)]
struct QueryReply {
    answer: String,
    success: bool,
    #[serde(default)]
    timing: Option<TimingPayload>,
}

/// Timing section of the batch reply. The service reports more phases than
/// the engine keeps; unknown fields are ignored.
#[derive(Deserialize)]
struct TimingPayload {
    #[serde(default)]
    retrieval: f64,
    #[serde(default)]
    llm_generation: f64,
    #[serde(default)]
    total: f64,
}

/// HTTP client for the COSMOS Answer Service
pub struct HttpAnswerService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnswerService {
    /// Create a client from connection settings
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder
            .build()
            .map_err(|e| CosmosError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn payload<'a>(request: &'a QueryRequest, model: &'a str) -> QueryPayload<'a> {
        // The service expects every known type with an explicit flag
        let filter_sources = SourceType::ALL
            .iter()
            .map(|t| (t.to_string(), request.source_filters.contains(t)))
            .collect();

        QueryPayload {
            query: &request.text,
            model_name: model,
            temperature: request.temperature,
            filter_sources,
        }
    }
}

#[async_trait]
impl AnswerService for HttpAnswerService {
    async fn stream_query(&self, request: &QueryRequest, model: &str) -> Result<AnswerStream> {
        let url = format!("{}/rag/query/stream", self.base_url);
        debug!(model, url = %url, "opening streaming query");

        let response = self
            .client
            .post(&url)
            .json(&Self::payload(request, model))
            .send()
            .await
            .map_err(|e| CosmosError::Transport(format!("stream request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CosmosError::Service(format!(
                "answer service returned {}",
                status
            )));
        }

        Ok(decode_text_stream(response.bytes_stream()))
    }

    async fn batch_query(&self, request: &QueryRequest, model: &str) -> Result<BatchAnswer> {
        let url = format!("{}/rag/query", self.base_url);
        debug!(model, url = %url, "sending batch query");

        let response = self
            .client
            .post(&url)
            .json(&Self::payload(request, model))
            .send()
            .await
            .map_err(|e| CosmosError::Transport(format!("query request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CosmosError::Service(format!(
                "answer service returned {}",
                status
            )));
        }

        let reply: QueryReply = response
            .json()
            .await
            .map_err(|e| CosmosError::Transport(format!("invalid query response: {}", e)))?;

        if !reply.success {
            return Err(CosmosError::Service(reply.answer));
        }

        let timing = reply.timing.map(|t| ModelTiming {
            model_name: model.to_string(),
            retrieval_seconds: t.retrieval,
            generation_seconds: t.llm_generation,
            total_seconds: t.total,
        });

        Ok(BatchAnswer {
            answer: reply.answer,
            timing,
        })
    }
}

/// Adapt a byte stream into a text stream.
///
/// Transport chunk boundaries are free to split UTF-8 sequences; incomplete
/// trailing bytes are carried into the next chunk so only whole characters
/// are ever emitted. Chunks that decode to nothing are skipped rather than
/// published as empty strings.
fn decode_text_stream<S, B, E>(inner: S) -> AnswerStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let stream = futures_util::stream::unfold(
        (Box::pin(inner.fuse()), Vec::new()),
        |(mut inner, mut carry)| async move {
            loop {
                match inner.next().await {
                    Some(Ok(bytes)) => {
                        carry.extend_from_slice(bytes.as_ref());
                        let text = match std::str::from_utf8(&carry) {
                            Ok(text) => {
                                let text = text.to_string();
                                carry.clear();
                                text
                            }
                            Err(e) => {
                                let valid = e.valid_up_to();
                                let text =
                                    String::from_utf8_lossy(&carry[..valid]).into_owned();
                                carry.drain(..valid);
                                text
                            }
                        };
                        if text.is_empty() {
                            continue;
                        }
                        return Some((Ok(text), (inner, carry)));
                    }
                    Some(Err(e)) => {
                        return Some((
                            Err(CosmosError::Transport(format!("stream read failed: {}", e))),
                            (inner, carry),
                        ));
                    }
                    None => {
                        if carry.is_empty() {
                            return None;
                        }
                        // Truncated trailing sequence at end-of-stream
                        let text = String::from_utf8_lossy(&carry).into_owned();
                        carry.clear();
                        if text.is_empty() {
                            return None;
                        }
                        return Some((Ok(text), (inner, carry)));
                    }
                }
            }
        },
    );

    Box::pin(stream)
}
