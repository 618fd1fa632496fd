use crate::core::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::utils::errors::HostResult;
use async_trait::async_trait;

/// Message channel to one MCP server
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the channel
    async fn connect(&self) -> HostResult<()>;

    /// Send a request and wait for response
    async fn send_request(&self, request: JsonRpcRequest) -> HostResult<JsonRpcResponse>;

    /// Send a notification (no response expected)
    async fn send_notification(&self, request: JsonRpcRequest) -> HostResult<()>;

    /// Check if transport is connected
    async fn is_connected(&self) -> bool;

    /// Close the transport
    async fn close(&self) -> HostResult<()>;
}
