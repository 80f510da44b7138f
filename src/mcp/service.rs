//! Request dispatcher.
//!
//! `DbService` reads one line, answers it, and only then reads the next. It owns
//! the connection manager (and with it the session), so at most one handler
//! ever touches the database at a time and responses leave in request order.

use crate::db::{ConnectionManager, Driver};
use crate::error::{DbError, DbResult};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse, Method, PROTOCOL_VERSION};
use crate::tools::{ToolCall, ToolKind, tool_catalog};
use futures_util::FutureExt;
use serde_json::{Value as JsonValue, json};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

pub const SERVER_NAME: &str = "mysql-mcp-server";

/// Where the dispatch loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    AwaitingRequest,
    Processing,
    Responding,
}

/// Why the dispatch loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The input stream reached EOF.
    InputClosed,
    /// The client sent `exit`.
    ExitRequested,
}

/// What to do after handling one line.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Write this response.
    Respond(JsonRpcResponse),
    /// Nothing to write (blank line or notification).
    Skip,
    /// The client asked the server to exit.
    Exit,
}

pub struct DbService<D: Driver> {
    connection_manager: ConnectionManager<D>,
    state: DispatchState,
}

impl<D: Driver> DbService<D> {
    pub fn new(connection_manager: ConnectionManager<D>) -> Self {
        Self {
            connection_manager,
            state: DispatchState::AwaitingRequest,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn connection_manager(&self) -> &ConnectionManager<D> {
        &self.connection_manager
    }

    /// Close the session connection.
    pub async fn shutdown(&mut self) {
        self.connection_manager.disconnect().await;
    }

    /// Read requests until EOF or `exit`, answering each before reading the next.
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> DbResult<StopReason>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        let reason = loop {
            self.state = DispatchState::AwaitingRequest;
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| DbError::internal(format!("Failed to read request: {}", e)))?;
            if read == 0 {
                info!("Input closed");
                break StopReason::InputClosed;
            }

            let outcome = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_line(line).await,
                Err(e) => Outcome::Respond(JsonRpcResponse::failure(
                    JsonValue::Null,
                    DbError::parse(format!("Request is not valid UTF-8: {}", e)),
                )),
            };

            match outcome {
                Outcome::Respond(response) => {
                    self.state = DispatchState::Responding;
                    let mut line = response.to_line();
                    line.push('\n');
                    writer
                        .write_all(line.as_bytes())
                        .await
                        .map_err(|e| DbError::internal(format!("Failed to write response: {}", e)))?;
                    writer
                        .flush()
                        .await
                        .map_err(|e| DbError::internal(format!("Failed to flush response: {}", e)))?;
                }
                Outcome::Skip => {}
                Outcome::Exit => {
                    info!("Exit requested");
                    break StopReason::ExitRequested;
                }
            }
        };
        self.state = DispatchState::AwaitingRequest;
        Ok(reason)
    }

    /// Handle one raw input line.
    pub async fn handle_line(&mut self, line: &str) -> Outcome {
        let line = line.trim();
        if line.is_empty() {
            return Outcome::Skip;
        }
        self.state = DispatchState::Processing;

        let request = match JsonRpcRequest::parse(line) {
            Ok(request) => request,
            Err((id, err)) => {
                warn!(error = %err, "Malformed request");
                return Outcome::Respond(JsonRpcResponse::failure(id, err));
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "Ignoring notification");
            return Outcome::Skip;
        }

        info!(method = %request.method, id = %request.id, "Received request");
        let Some(method) = Method::resolve(&request.method) else {
            return Outcome::Respond(JsonRpcResponse::failure(
                request.id,
                DbError::method_not_found(request.method),
            ));
        };

        let result = match method {
            Method::Exit => return Outcome::Exit,
            Method::Initialize => Ok(initialize_result()),
            Method::Shutdown => {
                self.connection_manager.disconnect().await;
                Ok(JsonValue::Null)
            }
            Method::ListTools => Ok(json!({ "tools": tool_catalog() })),
            Method::CallTool => match tool_call_target(request.params) {
                Ok((kind, arguments)) => self.run_tool(kind, arguments).await,
                Err(err) => Err(err),
            },
            Method::Tool(kind) => self.run_tool(kind, request.params).await,
        };

        Outcome::Respond(match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(err) => {
                warn!(method = %request.method, error = %err, "Request failed");
                JsonRpcResponse::failure(request.id, err)
            }
        })
    }

    async fn run_tool(&mut self, kind: ToolKind, params: JsonValue) -> DbResult<JsonValue> {
        let call = ToolCall::decode(kind, params)?;

        match AssertUnwindSafe(call.invoke(&mut self.connection_manager))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(tool = %kind, panic = %message, "Tool handler panicked");
                Err(DbError::internal(format!("{} failed unexpectedly: {}", kind, message)))
            }
        }
    }
}

fn initialize_result() -> JsonValue {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// Split `MCP/callTool` params into the tool and its arguments.
///
/// Accepts both `{tool, parameters}` and `{name, arguments}`.
fn tool_call_target(params: JsonValue) -> DbResult<(ToolKind, JsonValue)> {
    let JsonValue::Object(mut params) = params else {
        return Err(DbError::invalid_input("Tool call params must be an object"));
    };

    let name = match params.remove("tool").or_else(|| params.remove("name")) {
        Some(JsonValue::String(name)) => name,
        Some(_) => return Err(DbError::invalid_input("'tool' must be a string")),
        None => return Err(DbError::invalid_input("Missing required parameter 'tool'")),
    };
    let kind = ToolKind::from_name(&name).ok_or_else(|| DbError::method_not_found(name))?;

    let arguments = params
        .remove("parameters")
        .or_else(|| params.remove("arguments"))
        .unwrap_or(JsonValue::Null);
    Ok((kind, arguments))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
