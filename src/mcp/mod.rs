//! MCP (Model Context Protocol) service
//!
//! This module describes the server to MCP clients and runs the `decode`
//! tool. It knows nothing about envelopes or transports.

mod server;

pub use server::{
    CallToolParams, CallToolResult, Content, DECODE_TOOL, Implementation, InitializeResult,
    ListToolsResult, MangoCipherService, PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION,
    ServerCapabilities, Tool, ToolsCapability,
};
