//! Line-delimited JSON-RPC 2.0 transport exposing the tools in the MCP `tools/*` shape.

use anyhow::Result;
use common::tools::{ToolSpec, TOOL_SPECS};
use common::SqlAgent;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;

const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: message.into(),
        }
    }
}

pub async fn serve_stdio(agent: Arc<SqlAgent>) -> Result<()> {
    tracing::info!("serving {} tools on stdio", TOOL_SPECS.len());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve(agent, stdin, tokio::io::stdout()).await
}

/// answer requests from `reader` until it closes; requests are handled concurrently
pub async fn serve<R, W>(agent: Arc<SqlAgent>, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut pending: JoinSet<Option<Value>> = JoinSet::new();
    let mut input_open = true;

    while input_open || !pending.is_empty() {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line? {
                    Some(line) if !line.trim().is_empty() => {
                        match serde_json::from_str::<Request>(&line) {
                            Ok(request) => {
                                let agent = Arc::clone(&agent);
                                pending.spawn(handle_request(agent, request));
                            }
                            Err(e) => {
                                tracing::warn!("unparsable request: {}", e);
                                let response = error_response(
                                    Value::Null,
                                    RpcError { code: PARSE_ERROR, message: format!("parse error: {}", e) },
                                );
                                write_message(&mut writer, &response).await?;
                            }
                        }
                    }
                    Some(_) => {}
                    None => input_open = false,
                }
            }
            Some(joined) = pending.join_next(), if !pending.is_empty() => {
                match joined {
                    Ok(Some(response)) => write_message(&mut writer, &response).await?,
                    Ok(None) => {}
                    Err(e) => tracing::error!("request task failed: {}", e),
                }
            }
        }
    }

    tracing::info!("input closed, server stopping");
    Ok(())
}

async fn handle_request(agent: Arc<SqlAgent>, request: Request) -> Option<Value> {
    let Some(id) = request.id else {
        tracing::debug!(method = %request.method, "notification ignored");
        return None;
    };

    let result = match request.method.as_str() {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "askdb", "version": env!("CARGO_PKG_VERSION") },
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(list_tools()),
        "tools/call" => call_tool(agent, request.params).await,
        other => Err(RpcError {
            code: METHOD_NOT_FOUND,
            message: format!("method not found: {}", other),
        }),
    };

    Some(match result {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(e) => error_response(id, e),
    })
}

fn tool_descriptor(spec: &ToolSpec) -> Value {
    let mut properties = Map::new();
    properties.insert(spec.argument.to_string(), json!({ "type": "string" }));

    json!({
        "name": spec.name,
        "description": spec.description,
        "inputSchema": {
            "type": "object",
            "properties": properties,
            "required": [spec.argument],
        },
    })
}

fn list_tools() -> Value {
    json!({ "tools": TOOL_SPECS.iter().map(tool_descriptor).collect::<Vec<_>>() })
}

#[tracing::instrument(skip(agent, params))]
async fn call_tool(agent: Arc<SqlAgent>, params: Value) -> std::result::Result<Value, RpcError> {
    let params: CallParams = serde_json::from_value(params)
        .map_err(|e| RpcError::invalid_params(format!("invalid tools/call params: {}", e)))?;

    let spec = TOOL_SPECS
        .iter()
        .find(|spec| spec.name == params.name)
        .ok_or_else(|| RpcError::invalid_params(format!("unknown tool: {}", params.name)))?;

    let argument = params
        .arguments
        .get(spec.argument)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            RpcError::invalid_params(format!("missing string argument `{}`", spec.argument))
        })?
        .to_string();

    let name = spec.name;

    // tools block on sqlite, keep them off the runtime threads
    let outcome = tokio::task::spawn_blocking(move || agent.call_tool(name, &argument))
        .await
        .map_err(|e| RpcError {
            code: INTERNAL_ERROR,
            message: format!("task join error: {}", e),
        })?;

    let (text, is_error) = match outcome {
        Ok(text) => (text, false),
        Err(e) => {
            tracing::warn!(tool = name, "tool call failed: {}", e);
            (e.to_string(), true)
        }
    };

    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    }))
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": error.code, "message": error.message },
    })
}

async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) -> Result<()> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
