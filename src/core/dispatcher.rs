//! Capability catalogue and invocation routing
//!
//! Every invocation is independent: a failure is recorded in that call's
//! [`InvocationResult`] and its siblings in the batch carry on.

use crate::core::naming::NameCodec;
use crate::core::registry::Registry;
use crate::utils::errors::{HostError, HostResult};
use crate::utils::shutdown::cancellable;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A tool as presented to the language model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Composite name, `<tool>@<provider>`
    pub name: String,
    pub description: String,
    /// Provider's input schema, passed through unchanged
    pub parameters: Value,
}

/// A decoded invocation request
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of one invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub tool_name: String,
    pub parameters: Map<String, Value>,
    pub result: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl InvocationResult {
    pub fn failed(
        tool_name: impl Into<String>,
        parameters: Map<String, Value>,
        error: &HostError,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            result: String::new(),
            error: error.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Every connected provider's cached tools under composite names.
    ///
    /// Order is unspecified and may differ between calls.
    pub async fn build_catalogue(&self) -> Vec<CapabilityDescriptor> {
        let state = self.registry.read_state().await;

        state
            .connections
            .keys()
            .filter_map(|provider| state.tools.get(provider).map(|tools| (provider, tools)))
            .flat_map(|(provider, tools)| {
                tools.iter().map(move |tool| CapabilityDescriptor {
                    name: NameCodec::encode(&tool.name, provider),
                    description: tool.description.clone(),
                    parameters: tool.input_schema.clone(),
                })
            })
            .collect()
    }

    /// Route one invocation; never fails, errors land in the result
    pub async fn invoke(
        &self,
        invocation: ToolInvocation,
        token: &CancellationToken,
    ) -> InvocationResult {
        let ToolInvocation { name, arguments } = invocation;

        match self.try_invoke(&name, &arguments, token).await {
            Ok(text) => InvocationResult {
                tool_name: name,
                parameters: arguments,
                result: text,
                error: String::new(),
            },
            Err(e) => {
                if e.is_per_invocation() {
                    debug!("Invocation of {} failed: {}", name, e);
                } else {
                    warn!("Invocation of {} failed: {}", name, e);
                }
                InvocationResult::failed(name, arguments, &e)
            }
        }
    }

    async fn try_invoke(
        &self,
        composite: &str,
        arguments: &Map<String, Value>,
        token: &CancellationToken,
    ) -> HostResult<String> {
        let target = NameCodec::decode(composite)?;
        let connection = self.registry.get_connection(target.provider).await?;

        debug!("Invoking {} on {}", target.local, target.provider);
        let response = cancellable(token, async {
            connection
                .invoke(target.local, arguments)
                .await
                .map_err(|e| match e {
                    HostError::Cancelled => HostError::Cancelled,
                    other => HostError::InvocationFailed(other.to_string()),
                })
        })
        .await?;

        let text = response.first_text().unwrap_or_default().to_string();
        if response.is_error {
            return Err(HostError::InvocationFailed(if text.is_empty() {
                format!("{} reported an error", composite)
            } else {
                text
            }));
        }
        Ok(text)
    }

    /// Invoke each request in order; one result per request, same order
    pub async fn dispatch_batch(
        &self,
        invocations: Vec<ToolInvocation>,
        token: &CancellationToken,
    ) -> Vec<InvocationResult> {
        let mut results = Vec::with_capacity(invocations.len());
        for invocation in invocations {
            results.push(self.invoke(invocation, token).await);
        }
        results
    }
}
