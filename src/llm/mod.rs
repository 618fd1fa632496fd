//! Language-model collaborator

pub mod openai;

use crate::core::dispatcher::CapabilityDescriptor;
use crate::utils::errors::HostResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::OpenAiModel;

/// A tool call requested by the model, arguments still serialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub name: String,
    pub arguments: String,
}

impl InvocationRequest {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
    pub invocations: Vec<InvocationRequest>,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt` with `capabilities` offered as callable tools
    async fn complete(
        &self,
        prompt: &str,
        capabilities: &[CapabilityDescriptor],
    ) -> HostResult<ModelResponse>;
}
