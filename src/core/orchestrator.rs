//! Prompt -> model -> tool calls -> results

use crate::core::dispatcher::{Dispatcher, InvocationResult, ToolInvocation};
use crate::llm::{InvocationRequest, LanguageModel};
use crate::utils::errors::{HostError, HostResult};
use crate::utils::shutdown::cancellable;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Model text plus one result per requested invocation, in request order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletionOutcome {
    pub content: String,
    pub results: Vec<InvocationResult>,
}

/// Decode a serialized argument map. Blank payloads mean "no arguments".
pub fn decode_arguments(raw: &str) -> HostResult<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    serde_json::from_str(raw).map_err(|e| HostError::ArgumentDecodeFailed(e.to_string()))
}

pub struct CompletionOrchestrator {
    dispatcher: Arc<Dispatcher>,
    model: Arc<dyn LanguageModel>,
}

impl CompletionOrchestrator {
    pub fn new(dispatcher: Arc<Dispatcher>, model: Arc<dyn LanguageModel>) -> Self {
        Self { dispatcher, model }
    }

    /// Only a failing model call aborts the run; tool failures are per result.
    pub async fn run(
        &self,
        prompt: &str,
        token: &CancellationToken,
    ) -> HostResult<CompletionOutcome> {
        let catalogue = self.dispatcher.build_catalogue().await;
        debug!("Offering {} tools to the model", catalogue.len());

        let response = cancellable(token, async {
            self.model
                .complete(prompt, &catalogue)
                .await
                .map_err(|e| match e {
                    HostError::ModelFailed(_) | HostError::Cancelled => e,
                    other => HostError::ModelFailed(other.to_string()),
                })
        })
        .await?;

        if response.invocations.is_empty() {
            return Ok(CompletionOutcome {
                content: response.content,
                results: Vec::new(),
            });
        }

        info!("Model requested {} tool invocations", response.invocations.len());
        let results = self.dispatch(response.invocations, token).await;

        Ok(CompletionOutcome {
            content: response.content,
            results,
        })
    }

    /// Decode every request, dispatch the decodable ones as one batch and
    /// slot argument errors back in at their original positions.
    async fn dispatch(
        &self,
        requests: Vec<InvocationRequest>,
        token: &CancellationToken,
    ) -> Vec<InvocationResult> {
        let mut slots: Vec<Option<InvocationResult>> = Vec::with_capacity(requests.len());
        let mut batch = Vec::new();

        for request in requests {
            match decode_arguments(&request.arguments) {
                Ok(arguments) => {
                    batch.push(ToolInvocation::new(request.name, arguments));
                    slots.push(None);
                }
                Err(e) => {
                    debug!("Bad arguments for {}: {}", request.name, e);
                    slots.push(Some(InvocationResult::failed(request.name, Map::new(), &e)));
                }
            }
        }

        let mut dispatched = self.dispatcher.dispatch_batch(batch, token).await.into_iter();
        slots
            .into_iter()
            .filter_map(|slot| slot.or_else(|| dispatched.next()))
            .collect()
    }
}
