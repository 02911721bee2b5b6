//! Model Context Protocol (MCP) server implementation.
//!
//! Exposes the quoting engine (coordinate conversion, polygon metrics,
//! panel layout and the financial estimate) as tools to AI assistants. The
//! server communicates over stdio using newline-delimited JSON-RPC 2.0.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │   │  Transport  │───▶│   Server    │───▶│   Tools     │     │
//! │   │   (lines)   │    │ (lifecycle) │    │  (engine)   │     │
//! │   └─────────────┘    └─────────────┘    └─────────────┘     │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌─────────────────────────────────────────────────┐       │
//! │   │              JSON-RPC Messages                  │       │
//! │   └─────────────────────────────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallResult, MCP_PROTOCOL_VERSION,
};
pub use server::{tool_definitions, McpServer, ServerState};
pub use transport::{LineTransport, StdioTransport};
