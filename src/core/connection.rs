//! Provider connections
//!
//! [`ProviderConnection`] is the opaque RPC channel the registry owns for each
//! connected provider. [`RpcConnection`] implements it with MCP JSON-RPC
//! methods over any [`Transport`].

use crate::config::{ProviderConfig, TransportConfig};
use crate::core::protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    JsonRpcRequest, ListPromptsResult, ListResourcesResult, ListToolsResult, PromptDescriptor,
    ResourceDescriptor, ToolDescriptor, PROTOCOL_VERSION,
};
use crate::transport::{SseTransport, Transport};
use crate::utils::errors::{HostError, HostResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One channel to one remote provider.
///
/// Not assumed to multiplex: callers keep at most one call in flight per
/// connection unless the transport says otherwise.
#[async_trait]
pub trait ProviderConnection: Send + Sync {
    async fn connect(&self) -> HostResult<()>;

    /// Protocol handshake; returns the server's identity
    async fn initialize(&self, client: &Implementation) -> HostResult<InitializeResult>;

    async fn list_tools(&self) -> HostResult<Vec<ToolDescriptor>>;

    async fn list_resources(&self) -> HostResult<Vec<ResourceDescriptor>>;

    async fn list_prompts(&self) -> HostResult<Vec<PromptDescriptor>>;

    async fn invoke(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> HostResult<CallToolResult>;

    async fn ping(&self) -> HostResult<()>;

    async fn close(&self) -> HostResult<()>;
}

/// Creates unconnected provider connections
pub trait ConnectionFactory: Send + Sync {
    fn create(&self, config: &ProviderConfig) -> HostResult<Arc<dyn ProviderConnection>>;
}

/// MCP over JSON-RPC on top of a transport
pub struct RpcConnection<T: Transport> {
    transport: T,
}

impl<T: Transport> RpcConnection<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> HostResult<R> {
        let response = self
            .transport
            .send_request(JsonRpcRequest::new(method, params))
            .await?;

        if let Some(error) = response.error {
            return Err(HostError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        let result = response.result.unwrap_or_else(|| json!({}));
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl<T: Transport> ProviderConnection for RpcConnection<T> {
    async fn connect(&self) -> HostResult<()> {
        self.transport.connect().await
    }

    async fn initialize(&self, client: &Implementation) -> HostResult<InitializeResult> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: client.clone(),
        };
        let result: InitializeResult = self
            .call("initialize", Some(serde_json::to_value(&params)?))
            .await?;

        debug!(
            "Initialized {} {} (protocol {})",
            result.server_info.name, result.server_info.version, result.protocol_version
        );

        self.transport
            .send_notification(JsonRpcRequest::new("notifications/initialized", None))
            .await?;

        Ok(result)
    }

    async fn list_tools(&self) -> HostResult<Vec<ToolDescriptor>> {
        let result: ListToolsResult = self.call("tools/list", None).await?;
        Ok(result.tools)
    }

    async fn list_resources(&self) -> HostResult<Vec<ResourceDescriptor>> {
        let result: ListResourcesResult = self.call("resources/list", None).await?;
        Ok(result.resources)
    }

    async fn list_prompts(&self) -> HostResult<Vec<PromptDescriptor>> {
        let result: ListPromptsResult = self.call("prompts/list", None).await?;
        Ok(result.prompts)
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> HostResult<CallToolResult> {
        let params = CallToolParams { name, arguments };
        self.call("tools/call", Some(serde_json::to_value(&params)?))
            .await
    }

    async fn ping(&self) -> HostResult<()> {
        let _: Value = self.call("ping", None).await?;
        Ok(())
    }

    async fn close(&self) -> HostResult<()> {
        self.transport.close().await
    }
}

/// Default factory: one SSE transport per provider endpoint
pub struct SseConnectionFactory {
    request_timeout: Duration,
    connect_timeout: Duration,
}

impl SseConnectionFactory {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }
}

impl Default for SseConnectionFactory {
    fn default() -> Self {
        Self::new(&TransportConfig::default())
    }
}

impl ConnectionFactory for SseConnectionFactory {
    fn create(&self, config: &ProviderConfig) -> HostResult<Arc<dyn ProviderConnection>> {
        let transport =
            SseTransport::new(&config.endpoint, self.request_timeout, self.connect_timeout)?;
        Ok(Arc::new(RpcConnection::new(transport)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::{JsonRpcResponse, RequestId};
    use parking_lot::Mutex;

    /// Replies to each request with the next queued result and records methods.
    struct ScriptedTransport {
        replies: Mutex<Vec<JsonRpcResponse>>,
        sent: Mutex<Vec<JsonRpcRequest>>,
    }

    impl ScriptedTransport {
        fn new(mut replies: Vec<JsonRpcResponse>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn connect(&self) -> HostResult<()> {
            Ok(())
        }

        async fn send_request(&self, request: JsonRpcRequest) -> HostResult<JsonRpcResponse> {
            self.sent.lock().push(request);
            self.replies
                .lock()
                .pop()
                .ok_or_else(|| HostError::Transport("no reply scripted".to_string()))
        }

        async fn send_notification(&self, request: JsonRpcRequest) -> HostResult<()> {
            self.sent.lock().push(request);
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            true
        }

        async fn close(&self) -> HostResult<()> {
            Ok(())
        }
    }

    fn ok(result: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(RequestId::Number(1), result)
    }

    #[tokio::test]
    async fn test_initialize_sends_handshake_and_notification() {
        let transport = ScriptedTransport::new(vec![ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "Calculator", "version": "1.0.0"}
        }))]);
        let connection = RpcConnection::new(transport);

        let result = connection
            .initialize(&Implementation::new("mcphost", "0.1.0"))
            .await
            .unwrap();
        assert_eq!(result.server_info.name, "Calculator");

        let sent = connection.transport.sent.lock();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].method, "initialize");
        let params = sent[0].params.as_ref().unwrap();
        assert_eq!(params["clientInfo"]["name"], "mcphost");
        assert_eq!(sent[1].method, "notifications/initialized");
    }

    #[tokio::test]
    async fn test_invoke_and_error_mapping() {
        let transport = ScriptedTransport::new(vec![
            ok(json!({"content": [{"type": "text", "text": "55"}]})),
            JsonRpcResponse::error(RequestId::Number(2), -32602, "unknown tool"),
        ]);
        let connection = RpcConnection::new(transport);

        let mut args = Map::new();
        args.insert("a".to_string(), json!(22));
        args.insert("b".to_string(), json!(33));
        let result = connection.invoke("add", &args).await.unwrap();
        assert_eq!(result.first_text(), Some("55"));

        let err = connection.invoke("nope", &Map::new()).await.unwrap_err();
        assert!(matches!(err, HostError::Protocol { code: -32602, .. }));

        let sent = connection.transport.sent.lock();
        assert_eq!(sent[0].method, "tools/call");
        assert_eq!(sent[0].params.as_ref().unwrap()["name"], "add");
        assert_eq!(sent[0].params.as_ref().unwrap()["arguments"]["b"], 33);
    }

    #[tokio::test]
    async fn test_listing_and_ping() {
        let transport = ScriptedTransport::new(vec![
            ok(json!({"tools": [{"name": "generate", "description": "random"}]})),
            ok(json!({"resources": [{"uri": "resource://testresource", "name": "My Resource"}]})),
            ok(json!({})),
            ok(json!({})),
        ]);
        let connection = RpcConnection::new(transport);

        assert_eq!(connection.list_tools().await.unwrap()[0].name, "generate");
        assert_eq!(connection.list_resources().await.unwrap().len(), 1);
        assert!(connection.list_prompts().await.unwrap().is_empty());
        assert!(connection.ping().await.is_ok());
    }

    #[test]
    fn test_sse_factory_rejects_bad_endpoint() {
        let factory = SseConnectionFactory::default();
        assert!(factory
            .create(&ProviderConfig::new("calc", "::not-a-url"))
            .is_err());
        assert!(factory
            .create(&ProviderConfig::new("calc", "http://localhost:9293/sse"))
            .is_ok());
    }
}
