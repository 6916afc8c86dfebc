//! Mango Cipher - a minimal MCP server over HTTP JSON-RPC 2.0
//!
//! Exposes one tool, `decode`, which maps ten fruit words to the digits
//! 0-9. Everything else is protocol plumbing: envelope validation, method
//! routing, notification handling and batches.
//!
//! ## Methods
//!
//! - **`initialize`** - capability descriptor (`protocolVersion` `2024-11-05`)
//! - **`tools/list`** - the one-tool catalog
//! - **`tools/call`** - run `decode` with `{"word": "..."}`
//!
//! ## Example
//!
//! ```
//! use mango_cipher::{Dispatcher, Reply};
//! use serde_json::json;
//!
//! let dispatcher = Dispatcher::new();
//! let reply = dispatcher.handle_value(json!({
//!     "jsonrpc": "2.0",
//!     "id": 1,
//!     "method": "tools/call",
//!     "params": {"name": "decode", "arguments": {"word": "Banana"}}
//! }));
//!
//! let Reply::Single(response) = reply else { panic!("expected one response") };
//! assert_eq!(response.result.unwrap()["content"][0]["text"], "2");
//! ```

pub mod cipher;
pub mod config;
pub mod dispatcher;
pub mod http;
pub mod mcp;
pub mod types;

pub use cipher::{CipherTable, MANGO_CIPHER};
pub use config::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_MS, ServerConfig};
pub use dispatcher::{Dispatcher, Method, Reply};
pub use http::{HttpError, HttpServer};
pub use mcp::MangoCipherService;
pub use types::{ErrorObject, JSONRPC_VERSION, Response, RpcError, ServerError};
