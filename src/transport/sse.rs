//! SSE (Server-Sent Events) transport for MCP communication
//!
//! The server answers the initial GET with an `endpoint` event naming the URL
//! to POST requests to; responses come back on the stream as `message` events.

use crate::core::protocol::{JsonRpcRequest, JsonRpcResponse, RequestId};
use crate::transport::traits::Transport;
use crate::utils::errors::{HostError, HostResult};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::StreamExt;
use parking_lot::{Mutex, RwLock};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::Url;

type PendingMap = DashMap<RequestId, oneshot::Sender<JsonRpcResponse>>;

/// A single dispatched SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` parser.
///
/// Buffers raw bytes and only decodes complete lines, so a multi-byte
/// character split across network chunks survives intact.
#[derive(Debug, Default)]
pub struct SseEventParser {
    buffer: Vec<u8>,
    event: String,
    data: String,
}

impl SseEventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every event completed by it
    pub fn feed(&mut self, chunk: impl AsRef<[u8]>) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk.as_ref());
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let line = String::from_utf8_lossy(&raw);

            if line.is_empty() {
                if let Some(event) = self.take_event() {
                    events.push(event);
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (&*line, ""),
            };

            match field {
                "event" => self.event = value.to_string(),
                "data" => {
                    self.data.push_str(value);
                    self.data.push('\n');
                }
                _ => {}
            }
        }

        events
    }

    /// Flush a trailing event when the stream ends without a blank line
    pub fn finish(&mut self) -> Option<SseEvent> {
        self.take_event()
    }

    fn take_event(&mut self) -> Option<SseEvent> {
        let event = std::mem::take(&mut self.event);
        if self.data.is_empty() {
            return None;
        }
        let mut data = std::mem::take(&mut self.data);
        data.pop();
        Some(SseEvent {
            event: if event.is_empty() { "message".to_string() } else { event },
            data,
        })
    }
}

/// SSE transport for MCP servers
pub struct SseTransport {
    endpoint: Url,
    client: reqwest::Client,
    message_url: Arc<RwLock<Option<Url>>>,
    pending: Arc<PendingMap>,
    is_connected: Arc<AtomicBool>,
    next_id: AtomicI64,
    request_timeout: Duration,
    connect_timeout: Duration,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SseTransport {
    pub fn new(
        endpoint: impl AsRef<str>,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> HostResult<Self> {
        let endpoint = endpoint
            .as_ref()
            .parse::<Url>()
            .map_err(|e| HostError::Transport(format!("Invalid URL: {}", e)))?;

        // No overall timeout: it would cut the long-lived event stream.
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| HostError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint,
            client,
            message_url: Arc::new(RwLock::new(None)),
            pending: Arc::new(DashMap::new()),
            is_connected: Arc::new(AtomicBool::new(false)),
            next_id: AtomicI64::new(1),
            request_timeout,
            connect_timeout,
            reader: Mutex::new(None),
        })
    }

    fn start_reader(
        &self,
        response: reqwest::Response,
        endpoint_tx: oneshot::Sender<HostResult<Url>>,
    ) -> JoinHandle<()> {
        let base = self.endpoint.clone();
        let pending = self.pending.clone();
        let is_connected = self.is_connected.clone();

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut parser = SseEventParser::new();
            let mut endpoint_tx = Some(endpoint_tx);

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        for event in parser.feed(&bytes) {
                            handle_event(&base, &pending, &mut endpoint_tx, event);
                        }
                    }
                    Err(e) => {
                        error!("SSE stream error: {}", e);
                        break;
                    }
                }
            }

            if let Some(event) = parser.finish() {
                handle_event(&base, &pending, &mut endpoint_tx, event);
            }

            if let Some(tx) = endpoint_tx.take() {
                let _ = tx.send(Err(HostError::Transport(
                    "SSE stream closed before endpoint event".to_string(),
                )));
            }

            info!("SSE reader task ended for {}", base);
            is_connected.store(false, Ordering::SeqCst);
            pending.clear();
        })
    }

    fn message_url(&self) -> HostResult<Url> {
        self.message_url
            .read()
            .clone()
            .ok_or_else(|| HostError::Transport("Transport not connected".to_string()))
    }

    async fn post(&self, url: Url, json: String) -> HostResult<()> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(json)
            .send()
            .await
            .map_err(|e| HostError::Transport(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(HostError::Transport(format!(
                "HTTP error: {}",
                response.status()
            )));
        }
        Ok(())
    }
}

fn handle_event(
    base: &Url,
    pending: &PendingMap,
    endpoint_tx: &mut Option<oneshot::Sender<HostResult<Url>>>,
    event: SseEvent,
) {
    match event.event.as_str() {
        "endpoint" => {
            let resolved = base
                .join(event.data.trim())
                .map_err(|e| HostError::Transport(format!("Invalid endpoint event: {}", e)));
            if let Some(tx) = endpoint_tx.take() {
                let _ = tx.send(resolved);
            } else {
                debug!("Ignoring repeated endpoint event");
            }
        }
        "message" => {
            let value: Value = match serde_json::from_str(&event.data) {
                Ok(value) => value,
                Err(e) => {
                    debug!("Failed to parse SSE data: {}", e);
                    return;
                }
            };
            // Server-initiated requests and notifications carry a method.
            if value.get("method").is_some() {
                debug!("Ignoring server-initiated message: {}", event.data);
                return;
            }
            match serde_json::from_value::<JsonRpcResponse>(value) {
                Ok(response) => match response.id.clone() {
                    Some(id) => {
                        if let Some((_, tx)) = pending.remove(&id) {
                            let _ = tx.send(response);
                        } else {
                            debug!("Received SSE response with unknown id: {:?}", id);
                        }
                    }
                    None => debug!("Received SSE response without id, ignoring"),
                },
                Err(e) => debug!("Failed to parse SSE response: {}", e),
            }
        }
        other => debug!("Ignoring SSE event type '{}'", other),
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn connect(&self) -> HostResult<()> {
        info!("Connecting to SSE endpoint: {}", self.endpoint);

        let response = self
            .client
            .get(self.endpoint.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| HostError::Transport(format!("Failed to connect: {}", e)))?;

        if !response.status().is_success() {
            return Err(HostError::Transport(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let handle = self.start_reader(response, endpoint_tx);
        // Stored before waiting so close() can abort it even if this future is dropped.
        if let Some(old) = self.reader.lock().replace(handle) {
            old.abort();
        }

        let url = match tokio::time::timeout(self.connect_timeout, endpoint_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(HostError::Transport("SSE reader stopped".to_string())),
            Err(_) => Err(HostError::Timeout(self.connect_timeout.as_millis() as u64)),
        };

        let url = match url {
            Ok(url) => url,
            Err(e) => {
                if let Some(handle) = self.reader.lock().take() {
                    handle.abort();
                }
                return Err(e);
            }
        };

        debug!("SSE message endpoint: {}", url);
        *self.message_url.write() = Some(url);
        self.is_connected.store(true, Ordering::SeqCst);
        info!("SSE connection established");

        Ok(())
    }

    async fn send_request(&self, request: JsonRpcRequest) -> HostResult<JsonRpcResponse> {
        if !self.is_connected().await {
            return Err(HostError::Transport("Transport not connected".to_string()));
        }

        let request_id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let request = request.with_id(request_id.clone());

        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id.clone(), tx);

        let json = serde_json::to_string(&request)?;
        debug!("Sending SSE request: {}", json);

        let sent = match self.message_url() {
            Ok(url) => self.post(url, json).await,
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            self.pending.remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(HostError::Transport("Response channel closed".to_string())),
            Err(_) => {
                self.pending.remove(&request_id);
                Err(HostError::Timeout(self.request_timeout.as_millis() as u64))
            }
        }
    }

    async fn send_notification(&self, request: JsonRpcRequest) -> HostResult<()> {
        if !self.is_connected().await {
            return Err(HostError::Transport("Transport not connected".to_string()));
        }

        let mut request = request;
        request.id = None;

        let json = serde_json::to_string(&request)?;
        debug!("Sending SSE notification: {}", json);

        self.post(self.message_url()?, json).await
    }

    async fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> HostResult<()> {
        info!("Closing SSE transport for {}", self.endpoint);

        if let Some(handle) = self.reader.lock().take() {
            handle.abort();
        }
        *self.message_url.write() = None;
        self.is_connected.store(false, Ordering::SeqCst);
        self.pending.clear();
        Ok(())
    }
}
