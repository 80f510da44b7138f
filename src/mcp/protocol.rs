//! JSON-RPC 2.0 envelope.
//!
//! Requests are decoded in two steps: the raw line must be JSON (else a parse
//! error), then an object carrying a string `method` (else an invalid request).
//! Method names resolve into the closed `Method` enum.

use crate::error::DbError;
use crate::tools::ToolKind;
use serde::Serialize;
use serde_json::Value as JsonValue;

pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// A decoded request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    /// Echoed back verbatim. `Null` when the client sent none.
    pub id: JsonValue,
    pub method: String,
    pub params: JsonValue,
    /// Whether the message carried an `id` member at all.
    pub has_id: bool,
}

impl JsonRpcRequest {
    /// Decode one line of input.
    ///
    /// On failure, returns the error together with the id to answer with: `null`
    /// when the id could not be read.
    pub fn parse(line: &str) -> Result<Self, (JsonValue, DbError)> {
        let value: JsonValue = serde_json::from_str(line)
            .map_err(|e| (JsonValue::Null, DbError::parse(e.to_string())))?;

        let JsonValue::Object(mut obj) = value else {
            return Err((
                JsonValue::Null,
                DbError::invalid_request("Request must be a JSON object"),
            ));
        };

        let has_id = obj.contains_key("id");
        let id = obj.remove("id").unwrap_or(JsonValue::Null);
        let method = match obj.remove("method") {
            Some(JsonValue::String(method)) => method,
            Some(_) => {
                return Err((id, DbError::invalid_request("'method' must be a string")));
            }
            None => return Err((id, DbError::invalid_request("Missing 'method'"))),
        };
        let params = obj.remove("params").unwrap_or(JsonValue::Null);

        Ok(Self {
            id,
            method,
            params,
            has_id,
        })
    }

    /// Client notifications carry no id and expect no answer.
    pub fn is_notification(&self) -> bool {
        !self.has_id && self.method.starts_with("notifications/")
    }
}

/// Methods this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    Shutdown,
    Exit,
    ListTools,
    CallTool,
    /// A tool invoked directly by name.
    Tool(ToolKind),
}

impl Method {
    pub fn resolve(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Method::Initialize),
            "shutdown" => Some(Method::Shutdown),
            "exit" => Some(Method::Exit),
            "MCP/listTools" | "tools/list" => Some(Method::ListTools),
            "MCP/callTool" | "tools/call" => Some(Method::CallTool),
            other => ToolKind::from_name(other).map(Method::Tool),
        }
    }
}

/// Wire form of an error object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl From<DbError> for JsonRpcError {
    fn from(err: DbError) -> Self {
        let data = rmcp::ErrorData::from(err);
        Self {
            code: data.code.0,
            message: data.message.to_string(),
            data: data.data,
        }
    }
}

/// A response envelope. Exactly one of `result` / `error` is present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: JsonValue, result: JsonValue) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: JsonValue, err: DbError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(err.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serialize to a single line (no trailing newline).
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            // Only reachable if a result holds a non-string map key
            let fallback = JsonRpcResponse::failure(
                self.id.clone(),
                DbError::internal(format!("Failed to serialize response: {}", e)),
            );
            serde_json::to_string(&fallback).unwrap_or_default()
        })
    }
}
