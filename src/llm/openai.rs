//! OpenAI-compatible chat completions client

use crate::config::LlmConfig;
use crate::core::dispatcher::CapabilityDescriptor;
use crate::llm::{InvocationRequest, LanguageModel, ModelResponse};
use crate::utils::errors::{HostError, HostResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolSpec<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionSpec<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

pub struct OpenAiModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiModel {
    pub fn new(config: &LlmConfig) -> HostResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| HostError::ModelFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.resolved_base_url().trim_end_matches('/').to_string(),
            model: config.resolved_model(),
            api_key: config.resolved_api_key(),
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(
        &self,
        prompt: &str,
        capabilities: &[CapabilityDescriptor],
    ) -> HostResult<ModelResponse> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            tools: capabilities
                .iter()
                .map(|c| ToolSpec {
                    kind: "function",
                    function: FunctionSpec {
                        name: &c.name,
                        description: &c.description,
                        parameters: &c.parameters,
                    },
                })
                .collect(),
        };

        debug!(
            "Requesting completion from {} with {} tools",
            self.model,
            body.tools.len()
        );

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HostError::ModelFailed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(HostError::ModelFailed(format!("HTTP {}: {}", status, text)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| HostError::ModelFailed(format!("malformed response: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| HostError::ModelFailed("response contained no choices".to_string()))?;

        Ok(ModelResponse {
            content: choice.message.content.unwrap_or_default(),
            invocations: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| InvocationRequest::new(call.function.name, call.function.arguments))
                .collect(),
        })
    }
}
