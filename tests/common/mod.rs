//! In-memory providers and model shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use mcphost::config::ProviderConfig;
use mcphost::core::dispatcher::CapabilityDescriptor;
use mcphost::core::protocol::{
    CallToolResult, Content, Implementation, InitializeResult, PromptDescriptor,
    ResourceDescriptor, ServerCapabilities, ToolDescriptor, PROTOCOL_VERSION,
};
use mcphost::core::{ConnectionFactory, ProviderConnection, Registry};
use mcphost::llm::{LanguageModel, ModelResponse};
use mcphost::{HostError, HostResult};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Behavior {
    pub tools: Vec<ToolDescriptor>,
    pub resources: Vec<ResourceDescriptor>,
    pub prompts: Vec<PromptDescriptor>,
    pub fail_connect: bool,
    pub fail_initialize: bool,
    pub fail_list_prompts: bool,
    pub fail_ping: bool,
    pub hang_connect: bool,
}

impl Behavior {
    pub fn with_tools(names: &[&str]) -> Self {
        Self {
            tools: names.iter().map(|n| tool(n)).collect(),
            ..Self::default()
        }
    }
}

pub fn tool(name: &str) -> ToolDescriptor {
    ToolDescriptor::new(name, format!("{} tool", name))
}

/// Fake provider connection.
///
/// Tool semantics: `add` sums `a` and `b`, `fail` errors at transport level,
/// `error-result` returns an `isError` result, `no-text` returns no text;
/// anything else echoes `<provider>:<tool>`.
pub struct FakeConnection {
    pub provider: String,
    behavior: Mutex<Behavior>,
    pub ping_fails: AtomicBool,
    pub closed: AtomicBool,
    pub invocations: Mutex<Vec<(String, Map<String, Value>)>>,
    pub pings: AtomicUsize,
}

impl FakeConnection {
    fn new(provider: &str, behavior: Behavior) -> Self {
        Self {
            provider: provider.to_string(),
            ping_fails: AtomicBool::new(behavior.fail_ping),
            behavior: Mutex::new(behavior),
            closed: AtomicBool::new(false),
            invocations: Mutex::new(Vec::new()),
            pings: AtomicUsize::new(0),
        }
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn set_ping_fails(&self, fails: bool) {
        self.ping_fails.store(fails, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn behavior(&self) -> Behavior {
        self.behavior.lock().clone()
    }
}

#[async_trait]
impl ProviderConnection for FakeConnection {
    async fn connect(&self) -> HostResult<()> {
        let behavior = self.behavior();
        if behavior.hang_connect {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if behavior.fail_connect {
            return Err(HostError::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    async fn initialize(&self, _client: &Implementation) -> HostResult<InitializeResult> {
        if self.behavior().fail_initialize {
            return Err(HostError::Protocol {
                code: -32600,
                message: "unsupported protocol".to_string(),
            });
        }
        Ok(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: Implementation::new(format!("{}-server", self.provider), "1.0.0"),
            instructions: None,
        })
    }

    async fn list_tools(&self) -> HostResult<Vec<ToolDescriptor>> {
        Ok(self.behavior().tools)
    }

    async fn list_resources(&self) -> HostResult<Vec<ResourceDescriptor>> {
        Ok(self.behavior().resources)
    }

    async fn list_prompts(&self) -> HostResult<Vec<PromptDescriptor>> {
        let behavior = self.behavior();
        if behavior.fail_list_prompts {
            return Err(HostError::Protocol {
                code: -32601,
                message: "method not found".to_string(),
            });
        }
        Ok(behavior.prompts)
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> HostResult<CallToolResult> {
        self.invocations
            .lock()
            .push((name.to_string(), arguments.clone()));

        match name {
            "add" => {
                let a = arguments.get("a").and_then(Value::as_f64).unwrap_or_default();
                let b = arguments.get("b").and_then(Value::as_f64).unwrap_or_default();
                Ok(CallToolResult::text(format!("{}", a + b)))
            }
            "fail" => Err(HostError::Transport("broken pipe".to_string())),
            "error-result" => Ok(CallToolResult {
                content: vec![Content::text("bad input")],
                is_error: true,
            }),
            "no-text" => Ok(CallToolResult {
                content: vec![Content::Other],
                is_error: false,
            }),
            other => Ok(CallToolResult::text(format!("{}:{}", self.provider, other))),
        }
    }

    async fn ping(&self) -> HostResult<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.ping_fails.load(Ordering::SeqCst) {
            return Err(HostError::Transport("connection reset".to_string()));
        }
        Ok(())
    }

    async fn close(&self) -> HostResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out fake connections and remembers every one it created
#[derive(Default)]
pub struct FakeFactory {
    behaviors: Mutex<HashMap<String, Behavior>>,
    created: Mutex<Vec<Arc<FakeConnection>>>,
}

impl FakeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, provider: &str, behavior: Behavior) {
        self.behaviors.lock().insert(provider.to_string(), behavior);
    }

    /// Most recently created connection for `provider`
    pub fn last(&self, provider: &str) -> Option<Arc<FakeConnection>> {
        self.created
            .lock()
            .iter()
            .rev()
            .find(|c| c.provider == provider)
            .cloned()
    }

    pub fn created_count(&self, provider: &str) -> usize {
        self.created
            .lock()
            .iter()
            .filter(|c| c.provider == provider)
            .count()
    }
}

impl ConnectionFactory for FakeFactory {
    fn create(&self, config: &ProviderConfig) -> HostResult<Arc<dyn ProviderConnection>> {
        let behavior = self
            .behaviors
            .lock()
            .get(&config.name)
            .cloned()
            .unwrap_or_default();
        let connection = Arc::new(FakeConnection::new(&config.name, behavior));
        self.created.lock().push(connection.clone());
        Ok(connection)
    }
}

pub fn registry(factory: &Arc<FakeFactory>) -> Arc<Registry> {
    Arc::new(Registry::new(
        factory.clone(),
        Implementation::new("mcphost-test", "0.0.0"),
    ))
}

pub fn provider(name: &str) -> ProviderConfig {
    ProviderConfig::new(name, format!("http://localhost/{}/sse", name))
}

/// Registry with the given providers added and connected
pub async fn connected_registry(
    factory: &Arc<FakeFactory>,
    providers: &[(&str, Behavior)],
) -> Arc<Registry> {
    let registry = registry(factory);
    let token = tokio_util::sync::CancellationToken::new();
    for (name, behavior) in providers {
        factory.set(name, behavior.clone());
        registry.add_provider(provider(name)).await.unwrap();
        registry.connect(name, &token).await.unwrap();
    }
    registry
}

/// Language model returning a fixed response and recording what it was offered
pub struct ScriptedModel {
    response: Result<ModelResponse, String>,
    pub seen_prompts: Mutex<Vec<String>>,
    pub seen_tools: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn responding(response: ModelResponse) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(response),
            seen_prompts: Mutex::new(Vec::new()),
            seen_tools: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Err(message.to_string()),
            seen_prompts: Mutex::new(Vec::new()),
            seen_tools: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        prompt: &str,
        capabilities: &[CapabilityDescriptor],
    ) -> HostResult<ModelResponse> {
        self.seen_prompts.lock().push(prompt.to_string());
        self.seen_tools
            .lock()
            .extend(capabilities.iter().map(|c| c.name.clone()));
        match &self.response {
            Ok(response) => Ok(response.clone()),
            Err(message) => Err(HostError::ModelFailed(message.clone())),
        }
    }
}
