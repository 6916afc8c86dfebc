//! Request validation, method routing and batch handling

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::mcp::{CallToolParams, MangoCipherService};
use crate::types::{JSONRPC_VERSION, Response, RpcError};

/// Methods the server understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    ToolsList,
    ToolsCall,
    Unknown,
}

impl Method {
    /// Resolve a method name by exact match
    pub fn parse(name: Option<&str>) -> Self {
        match name {
            Some("initialize") => Method::Initialize,
            Some("tools/list") => Method::ToolsList,
            Some("tools/call") => Method::ToolsCall,
            _ => Method::Unknown,
        }
    }
}

/// What the transport should send back for one request body
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// One response envelope
    Single(Response),
    /// A non-empty, ordered list of response envelopes
    Batch(Vec<Response>),
    /// Nothing to send: notifications only, or an empty batch
    NoContent,
}

impl Reply {
    /// Serialize the reply body; `None` for [`Reply::NoContent`]
    pub fn to_body(&self) -> Result<Option<Vec<u8>>, serde_json::Error> {
        match self {
            Reply::Single(response) => serde_json::to_vec(response).map(Some),
            Reply::Batch(responses) => serde_json::to_vec(responses).map(Some),
            Reply::NoContent => Ok(None),
        }
    }
}

/// Routes decoded JSON-RPC requests to the MCP service.
///
/// Holds no mutable state; one dispatcher can serve any number of
/// connections concurrently.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    service: MangoCipherService,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a raw request body.
    ///
    /// A body that is not JSON yields a single parse-error envelope, whether
    /// or not it was meant as a batch.
    pub fn handle_body(&self, body: &[u8]) -> Reply {
        match serde_json::from_slice::<Value>(body) {
            Ok(payload) => self.handle_value(payload),
            Err(e) => {
                debug!(error = %e, "request body is not valid JSON");
                Reply::Single(Response::error(Value::Null, &RpcError::ParseError))
            }
        }
    }

    /// Handle an already-decoded payload, single or batch
    pub fn handle_value(&self, payload: Value) -> Reply {
        match payload {
            Value::Array(requests) => {
                let responses: Vec<Response> = requests
                    .iter()
                    .filter_map(|request| self.process(request))
                    .collect();
                if responses.is_empty() {
                    Reply::NoContent
                } else {
                    Reply::Batch(responses)
                }
            }
            request => match self.process(&request) {
                Some(response) => Reply::Single(response),
                None => Reply::NoContent,
            },
        }
    }

    /// Process one request.
    ///
    /// Returns `None` only for a notification (no `id`, or `id: null`) that
    /// succeeded. Failed notifications still get an error envelope.
    pub fn process(&self, request: &Value) -> Option<Response> {
        let id = request.get("id").cloned().unwrap_or(Value::Null);

        if request.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            debug!(%id, "rejecting request without jsonrpc 2.0 tag");
            return Some(Response::error(id, &RpcError::InvalidRequest));
        }

        let method = Method::parse(request.get("method").and_then(Value::as_str));
        let params = request.get("params").unwrap_or(&Value::Null);
        debug!(?method, %id, "dispatching request");

        match self.dispatch(method, params) {
            Ok(_) if id.is_null() => None,
            Ok(result) => Some(Response::success(id, result)),
            Err(err) => Some(Response::error(id, &err)),
        }
    }

    fn dispatch(&self, method: Method, params: &Value) -> Result<Value, RpcError> {
        match method {
            Method::Initialize => to_result(self.service.initialize()),
            Method::ToolsList => to_result(self.service.list_tools()),
            Method::ToolsCall => {
                let call = CallToolParams::from_params(params);
                to_result(self.service.call_tool(&call)?)
            }
            Method::Unknown => Err(RpcError::MethodNotFound),
        }
    }
}

fn to_result<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::Internal(e.to_string()))
}
