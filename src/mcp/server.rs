//! MCP service exposing the Mango Cipher `decode` tool
//!
//! Builds the payloads for `initialize`, `tools/list` and `tools/call`.
//! Envelope handling lives in the dispatcher.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::cipher::CipherTable;
use crate::types::RpcError;

/// MCP protocol revision this server speaks
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const SERVER_NAME: &str = "mango-cipher";
pub const SERVER_VERSION: &str = "1.0.0";

/// Name of the single tool on offer
pub const DECODE_TOOL: &str = "decode";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Result of `initialize`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
}

/// Capabilities advertised to the client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Present and empty: tools are supported, with no extra options
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {}

/// Server identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

/// A tool definition as listed by `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Result of `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// One item of tool output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }
}

/// Result of `tools/call`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
}

impl CallToolResult {
    pub fn success(content: Vec<Content>) -> Self {
        Self { content }
    }
}

/// Parameters of `tools/call`.
///
/// Both fields stay loosely typed: a missing or oddly-typed value must turn
/// into a protocol error, not a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallToolParams {
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub arguments: Value,
}

impl CallToolParams {
    /// Read the call parameters, treating a non-object `params` as empty
    pub fn from_params(params: &Value) -> Self {
        if !params.is_object() {
            return Self::default();
        }
        serde_json::from_value(params.clone()).unwrap_or_default()
    }

    fn tool_name(&self) -> String {
        match &self.name {
            Value::String(name) => name.clone(),
            other => other.to_string(),
        }
    }

    /// The `word` argument as text; absent or null reads as empty
    fn word(&self) -> String {
        match self.arguments.get("word") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(word)) => word.clone(),
            Some(other) => other.to_string(),
        }
    }
}

// ============================================================================
// MCP Service
// ============================================================================

/// Mango Cipher MCP Service
///
/// Stateless apart from the read-only cipher table, so one instance can be
/// shared across every connection.
#[derive(Debug, Clone, Default)]
pub struct MangoCipherService {
    cipher: CipherTable,
}

impl MangoCipherService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capability descriptor; independent of anything the client sends
    pub fn initialize(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        }
    }

    /// The one-tool catalog
    pub fn list_tools(&self) -> ListToolsResult {
        ListToolsResult {
            tools: vec![decode_tool_definition()],
        }
    }

    /// Run a tool by name
    pub fn call_tool(&self, params: &CallToolParams) -> Result<CallToolResult, RpcError> {
        let name = params.tool_name();
        if name != DECODE_TOOL {
            return Err(RpcError::UnknownTool(name));
        }
        self.decode(&params.word())
    }

    /// Decode one word, case-insensitively
    pub fn decode(&self, word: &str) -> Result<CallToolResult, RpcError> {
        match self.cipher.decode(word) {
            (_, Some(digit)) => Ok(CallToolResult::success(vec![Content::text(
                digit.to_string(),
            )])),
            (normalised, None) => Err(RpcError::WordNotInCipher(normalised)),
        }
    }
}

/// Definition for the decode tool
fn decode_tool_definition() -> Tool {
    Tool {
        name: DECODE_TOOL.to_string(),
        description: "Using the Mango Cipher, convert a fruit word to its number (0-9)"
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "word": {
                    "type": "string",
                    "description": "Fruit word to decode"
                }
            },
            "required": ["word"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(params: Value) -> Result<CallToolResult, RpcError> {
        MangoCipherService::new().call_tool(&CallToolParams::from_params(&params))
    }

    #[test]
    fn test_initialize_descriptor() {
        let value = serde_json::to_value(MangoCipherService::new().initialize()).unwrap();
        assert_eq!(
            value,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "mango-cipher", "version": "1.0.0"}
            })
        );
    }

    #[test]
    fn test_list_tools_has_decode_only() {
        let value = serde_json::to_value(MangoCipherService::new().list_tools()).unwrap();
        let tools = value["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "decode");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["word"]));
        assert_eq!(
            tools[0]["inputSchema"]["properties"]["word"]["type"],
            "string"
        );
    }

    #[test]
    fn test_content_serializes_as_text_item() {
        let value = serde_json::to_value(Content::text("7")).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "7"}));
    }

    #[test]
    fn test_decode_known_word() {
        let result = call(json!({"name": "decode", "arguments": {"word": "lemon"}})).unwrap();
        assert_eq!(result.content, vec![Content::text("7")]);
    }

    #[test]
    fn test_decode_is_case_insensitive() {
        let result = call(json!({"name": "decode", "arguments": {"word": "BANANA"}})).unwrap();
        assert_eq!(result.content, vec![Content::text("2")]);
    }

    #[test]
    fn test_unknown_word_is_lowercased_in_error() {
        let err = call(json!({"name": "decode", "arguments": {"word": "KIWI"}})).unwrap_err();
        assert_eq!(err, RpcError::WordNotInCipher("kiwi".to_string()));
    }

    #[test]
    fn test_missing_word_reads_as_empty() {
        let err = call(json!({"name": "decode"})).unwrap_err();
        assert_eq!(err.to_string(), "Word '' not in mango cipher");
    }

    #[test]
    fn test_non_string_word_is_rendered() {
        let err = call(json!({"name": "decode", "arguments": {"word": 5}})).unwrap_err();
        assert_eq!(err.to_string(), "Word '5' not in mango cipher");
    }

    #[test]
    fn test_unknown_tool() {
        let err = call(json!({"name": "encode", "arguments": {"word": "mango"}})).unwrap_err();
        assert_eq!(err, RpcError::UnknownTool("encode".to_string()));
    }

    #[test]
    fn test_missing_tool_name() {
        let err = call(json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: null");
    }

    #[test]
    fn test_non_object_params_read_as_empty() {
        let params = CallToolParams::from_params(&json!(["decode"]));
        assert!(params.name.is_null());
        assert!(params.arguments.is_null());
    }
}
