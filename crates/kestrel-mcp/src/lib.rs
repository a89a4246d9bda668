//! MCP (Model Context Protocol) wire types for the Kestrel gateway.
//!
//! This crate holds the server side of the protocol: JSON-RPC 2.0 envelopes,
//! the `initialize` handshake, and the `tools/list` / `tools/call` payloads.
//! It has no transport or runtime dependencies.
//!
//! # Protocol flow
//!
//! ```text
//! client                               server
//!   │ initialize ───────────────────────▶ │
//!   │ ◀─────────────── InitializeResult   │
//!   │ notifications/initialized ────────▶ │   (no response)
//!   │ tools/list ───────────────────────▶ │
//!   │ ◀─────────────── ListToolsResult    │
//!   │ tools/call {name, arguments} ─────▶ │
//!   │ ◀─────────────── CallToolResult     │   {content, isError?, _meta?}
//! ```
//!
//! Tool failures travel inside a successful JSON-RPC response as a
//! [`CallToolResult`] with `isError: true`; JSON-RPC errors are reserved for
//! protocol-level problems (unknown method, malformed params).

pub mod error;
pub mod protocol;

pub use error::{McpError, Result};
pub use protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, MCP_PROTOCOL_VERSION,
    RequestId, ServerCapabilities, ToolAnnotations, ToolContent, ToolInfo, ToolsCapability,
};
