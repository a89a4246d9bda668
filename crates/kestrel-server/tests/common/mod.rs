//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use kestrel_cache::{CacheConfig, ResponseCache};
use kestrel_config::KestrelConfig;
use kestrel_server::{Gateway, Server, ServerConfig};
use kestrel_tools::testing::{EchoTool, MockUpstream};

/// TTL of the echo tool's cache family.
pub const ECHO_TTL: Duration = Duration::from_millis(300);

/// Keep-alive interval used by test servers, short so dropped clients are
/// noticed quickly.
pub const TEST_KEEP_ALIVE: Duration = Duration::from_millis(100);

/// How long to wait for any single SSE event.
const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client configured for this server.
    pub client: Client,
    /// Upstream behind the provider tools.
    pub upstream: Arc<MockUpstream>,
    /// Cached echo tool, for counting executions.
    pub echo: EchoTool,
    /// Stops the server when cancelled.
    pub shutdown: CancellationToken,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with default configuration (no API key).
    pub async fn start() -> Result<Self> {
        Self::start_with_config(KestrelConfig::default()).await
    }

    /// Start a new test server with the provider API key set.
    pub async fn start_configured() -> Result<Self> {
        let mut config = KestrelConfig::default();
        config.provider.api_key = Some("test-key".to_string());
        Self::start_with_config(config).await
    }

    /// Start a new test server with the given configuration.
    pub async fn start_with_config(config: KestrelConfig) -> Result<Self> {
        let upstream = Arc::new(MockUpstream::new());
        let echo = EchoTool::new();

        let mut gateway = Gateway::from_config(&config, upstream.clone())?;
        gateway.registry.register_cached(
            echo.clone(),
            ResponseCache::new(CacheConfig::new("echo").with_ttl(ECHO_TTL)),
        )?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let shutdown = CancellationToken::new();
        let server_config = ServerConfig::new()
            .with_bind_address(addr)
            .with_keep_alive(TEST_KEEP_ALIVE);
        let server = Server::new(gateway, server_config, shutdown.clone());
        let handle = tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            upstream,
            echo,
            shutdown,
            _handle: handle,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get a request builder.
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    /// Get a POST request builder.
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    /// Fetch `/health` as JSON.
    pub async fn health(&self) -> Result<Value> {
        let resp = self.get("/health").send().await?;
        if !resp.status().is_success() {
            bail!("health returned {}", resp.status());
        }
        Ok(resp.json().await?)
    }

    /// Open an SSE session and read its endpoint event.
    pub async fn connect(&self) -> Result<SseSession> {
        let resp = self.get("/sse").send().await?;
        if resp.status() != StatusCode::OK {
            bail!("GET /sse returned {}", resp.status());
        }

        let mut session = SseSession {
            base_url: self.base_url(),
            client: self.client.clone(),
            events: resp.bytes_stream().map(|c| c.map(|b| b.to_vec())).boxed(),
            buffer: String::new(),
            endpoint: String::new(),
            session_id: Uuid::nil(),
            next_id: 1,
        };

        let first = session.next_event().await?;
        if first.event != "endpoint" {
            bail!("first event was '{}', expected 'endpoint'", first.event);
        }
        let id = first
            .data
            .split("sessionId=")
            .nth(1)
            .context("endpoint has no sessionId")?;
        session.session_id = Uuid::parse_str(id)?;
        session.endpoint = first.data;

        Ok(session)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// One parsed SSE event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    /// Event name (`message` if unnamed).
    pub event: String,
    /// Event data, multi-line data joined with `\n`.
    pub data: String,
}

/// A client-side MCP session over SSE.
pub struct SseSession {
    base_url: String,
    client: Client,
    events: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    buffer: String,
    /// Endpoint path from the first event.
    pub endpoint: String,
    /// Session id embedded in the endpoint.
    pub session_id: Uuid,
    next_id: i64,
}

impl SseSession {
    /// Post a raw JSON body to the session endpoint.
    pub async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url, self.endpoint))
            .json(body)
            .send()
            .await?)
    }

    /// Send a request and wait for its response on the stream.
    pub async fn request(&mut self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let resp = self
            .post(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .await?;
        if resp.status() != StatusCode::ACCEPTED {
            bail!("POST {} returned {}", self.endpoint, resp.status());
        }

        let event = self.next_event().await?;
        if event.event != "message" {
            bail!("expected 'message' event, got '{}'", event.event);
        }
        let response: Value = serde_json::from_str(&event.data)?;
        if response["id"] != json!(id) {
            bail!("response id {} does not match request id {}", response["id"], id);
        }
        Ok(response)
    }

    /// Call a tool and return the `result` object.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value> {
        let response = self
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;
        response
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("tools/call returned an error: {}", response))
    }

    /// The next event, failing after a timeout.
    pub async fn next_event(&mut self) -> Result<SseEvent> {
        self.next_event_within(EVENT_TIMEOUT)
            .await?
            .ok_or_else(|| anyhow!("timed out waiting for SSE event"))
    }

    /// The next event, or `None` if none arrives within `wait`.
    /// Keep-alive comments are skipped.
    pub async fn next_event_within(&mut self, wait: Duration) -> Result<Option<SseEvent>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            while let Some(pos) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..pos + 2).collect();
                if let Some(event) = parse_event(&block) {
                    return Ok(Some(event));
                }
            }

            let chunk = match tokio::time::timeout_at(deadline, self.events.next()).await {
                Err(_) => return Ok(None),
                Ok(None) => bail!("SSE stream closed"),
                Ok(Some(chunk)) => chunk?,
            };
            self.buffer
                .push_str(&String::from_utf8_lossy(&chunk).replace("\r\n", "\n"));
        }
    }
}

/// Text of a tool result's first content block, decoded as JSON.
pub fn result_json(result: &Value) -> Result<Value> {
    let text = result["content"][0]["text"]
        .as_str()
        .context("result has no text content")?;
    Ok(serde_json::from_str(text)?)
}

/// Whether a tool result was served from cache, if it says.
pub fn cached(result: &Value) -> Option<bool> {
    result["_meta"]["cached"].as_bool()
}

fn parse_event(block: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data = Vec::new();

    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("event:") {
            event = Some(value.trim_start().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
    }

    if event.is_none() && data.is_empty() {
        return None;
    }
    Some(SseEvent {
        event: event.unwrap_or_else(|| "message".to_string()),
        data: data.join("\n"),
    })
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => bail!("Timeout waiting for server to start"),
    }
}
