//! Concurrent fan-out with a single join
//!
//! One task per model, spawned at dispatch time, each writing into the slot
//! matching its position in the caller's model list. The aggregator suspends
//! only at the join over all slots; a failing call never delays, cancels,
//! or alters a sibling. Dropping the aggregator future aborts every
//! outstanding task (`JoinSet` semantics), so cancellation cannot race a
//! late write.

use crate::answer::{AnswerService, BatchAnswer, QueryRequest};
use crate::citation::{CitationProcessor, ProcessedAnswer};
use cosmos_common::ModelTiming;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// How one model's call settled, kept in its dispatch-order slot
#[derive(Debug, Clone)]
pub enum ModelOutcome {
    Answered {
        model: String,
        answer: String,
        timing: Option<ModelTiming>,
    },
    Failed {
        model: String,
        detail: String,
    },
}

/// Fans one query out to every selected model and merges the results
pub struct BatchAggregator<'a> {
    service: &'a Arc<dyn AnswerService>,
    processor: &'a CitationProcessor,
}

impl<'a> BatchAggregator<'a> {
    pub fn new(service: &'a Arc<dyn AnswerService>, processor: &'a CitationProcessor) -> Self {
        Self { service, processor }
    }

    /// Run the full fan-out for `request` and return the merged,
    /// citation-processed answer.
    ///
    /// Citation numbering is global across model segments because the
    /// processor runs over the merged text.
    pub async fn run(&self, request: &QueryRequest, diagnostics: bool) -> ProcessedAnswer {
        let outcomes = self.aggregate(request).await;
        let merged = merge(&outcomes, diagnostics);
        self.processor.process(&merged)
    }

    /// Issue all calls at once and wait for every one of them to settle
    pub async fn aggregate(&self, request: &QueryRequest) -> Vec<ModelOutcome> {
        let models = &request.selected_models;
        info!(models = models.len(), "dispatching batch fan-out");

        let mut tasks: JoinSet<(usize, ModelOutcome)> = JoinSet::new();
        for (slot, model) in models.iter().enumerate() {
            let service = Arc::clone(self.service);
            let request = request.clone();
            let model = model.clone();
            tasks.spawn(async move {
                let outcome = match service.batch_query(&request, &model).await {
                    Ok(BatchAnswer { answer, timing }) => {
                        debug!(%model, "model answered");
                        ModelOutcome::Answered {
                            model,
                            answer,
                            timing,
                        }
                    }
                    Err(e) => {
                        warn!(%model, error = %e, "model call failed");
                        ModelOutcome::Failed {
                            model,
                            detail: e.to_string(),
                        }
                    }
                };
                (slot, outcome)
            });
        }

        let mut slots: Vec<Option<ModelOutcome>> = models.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => slots[slot] = Some(outcome),
                Err(e) => warn!(error = %e, "batch task did not settle"),
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(slot, outcome)| {
                outcome.unwrap_or_else(|| ModelOutcome::Failed {
                    model: models[slot].clone(),
                    detail: "task aborted before completion".to_string(),
                })
            })
            .collect()
    }
}

/// Build the combined answer, iterating outcomes in their slot order
fn merge(outcomes: &[ModelOutcome], diagnostics: bool) -> String {
    let mut segments = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            ModelOutcome::Answered {
                model,
                answer,
                timing,
            } => {
                let mut segment = format!("**{}**:\n{}", model, answer);
                if diagnostics {
                    if let Some(t) = timing {
                        segment.push_str(&format!(
                            "\n_{:.2}s total · retrieval {:.2}s · generation {:.2}s_",
                            t.total_seconds, t.retrieval_seconds, t.generation_seconds
                        ));
                    }
                }
                segments.push(segment);
            }
            ModelOutcome::Failed { model, detail } => {
                segments.push(format!("**{}**:\nError: {}", model, detail));
            }
        }
    }
    segments.join("\n\n")
}
