use clap::Subcommand;
use serde_json::{Map, Value, json};
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, info, warn};

pub mod args;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod tools;
pub mod transfer;
mod util;

use config::{ConnectionArgs, RuntimeConfig};
use dispatch::{Dispatcher, InvocationRequest};
use gateway::SlackClient;
use tools::tool_definitions;
use util::to_pretty_json;

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SERVER_NAME: &str = "slack-mcp";

#[derive(Subcommand, Clone, Debug)]
pub enum McpCommands {
    /// Run the Slack MCP server over stdio
    Serve,
    /// Check the configured token against auth.test and print a report
    Diagnose,
}

pub async fn run(connection: ConnectionArgs, command: McpCommands) -> i32 {
    let config = match RuntimeConfig::from_args(connection) {
        Ok(config) => config,
        Err(err) => return report_startup_error("config_error", &err.to_string()),
    };
    let slack = match SlackClient::new(&config) {
        Ok(slack) => slack,
        Err(err) => return report_startup_error("config_error", &err.to_string()),
    };

    match command {
        McpCommands::Serve => {
            info!(
                api_url = %config.api_url,
                team_id = %config.team_id,
                restricted_channels = config.channel_ids.len(),
                "starting MCP server on stdio"
            );
            let server = McpServer::new(Dispatcher::new(slack, config.channel_ids.clone()));
            match server.serve_stdio().await {
                Ok(()) => 0,
                Err(err) => report_startup_error("mcp_server_error", &err),
            }
        }
        McpCommands::Diagnose => match slack.auth_test().await {
            Ok(body) => {
                let ok = body.get("ok").and_then(Value::as_bool).unwrap_or(false);
                let report = json!({
                    "status": if ok { "ready" } else { "auth_failed" },
                    "api_url": config.api_url,
                    "team_id": config.team_id,
                    "auth_test": body,
                });
                println!("{}", to_pretty_json(&report));
                if ok { 0 } else { 2 }
            }
            Err(err) => report_startup_error("connection_error", &err.to_string()),
        },
    }
}

fn report_startup_error(code: &str, message: &str) -> i32 {
    let payload = json!({
        "error": code,
        "message": message,
    });
    eprintln!("{}", to_pretty_json(&payload));
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// One JSON document per line (MCP stdio transport)
    Line,
    /// LSP-style `Content-Length` headers
    ContentLength,
}

#[derive(Debug)]
enum Incoming {
    Message(Value),
    Malformed(String),
}

pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn serve_stdio(&self) -> Result<(), String> {
        let mut reader = BufReader::new(io::stdin());
        let mut stdout = io::stdout();
        self.serve(&mut reader, &mut stdout).await
    }

    /// Reads messages until EOF; each message is handled to completion
    /// before the next one is read.
    pub async fn serve<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let incoming = read_framed_json(reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            let Some((incoming, framing)) = incoming else {
                break;
            };

            let responses = match incoming {
                Incoming::Message(message) => self.handle_incoming_message(message).await,
                Incoming::Malformed(reason) => {
                    warn!(%reason, "discarding malformed MCP message");
                    vec![error_response(Value::Null, RpcError::parse_error(reason))]
                }
            };
            for response in responses {
                write_framed_json(writer, &response, framing)
                    .await
                    .map_err(|e| format!("Failed to write MCP response: {e}"))?;
            }
        }

        info!("stdin closed, MCP server stopping");
        Ok(())
    }

    async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // A client response; this server never issues requests.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        if let Some(id) = obj.get("id").cloned() {
            let result = self.handle_request(method, params).await;
            Some(match result {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            })
        } else {
            debug!(method, "notification ignored");
            None
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let request = InvocationRequest {
            tool_name: name.to_string(),
            arguments: params.get("arguments").cloned(),
        };
        Ok(self.dispatcher.invoke(request).await.into_tool_content())
    }
}

fn initialize_payload() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "serverInfo": {
            "name": MCP_SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tool_definitions()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    let mut payload = Map::new();
    payload.insert("jsonrpc".to_string(), json!("2.0"));
    payload.insert("id".to_string(), id);
    payload.insert(
        "error".to_string(),
        json!({
            "code": error.code,
            "message": error.message
        }),
    );
    Value::Object(payload)
}

/// Only failures of the underlying stream are errors. Anything a client can
/// send, however broken, comes back as an [`Incoming`] so the session goes on.
async fn read_framed_json<R>(
    reader: &mut R,
) -> Result<Option<(Incoming, Framing)>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(None);
        }
        if !line.trim_ascii().is_empty() {
            break;
        }
    }

    let first = line.trim_ascii();
    if !is_content_length_header(first) {
        return Ok(Some((parse_payload(first), Framing::Line)));
    }

    let mut content_length = parse_content_length(first);
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            warn!("stdin closed inside an MCP header block");
            return Ok(None);
        }
        let header = line.trim_ascii();
        if header.is_empty() {
            break;
        }
        if is_content_length_header(header) {
            content_length = parse_content_length(header);
        }
    }

    let Some(content_length) = content_length else {
        let reason = "Invalid Content-Length header".to_string();
        return Ok(Some((Incoming::Malformed(reason), Framing::ContentLength)));
    };
    let mut payload = vec![0_u8; content_length];
    match reader.read_exact(&mut payload).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            warn!(content_length, "stdin closed inside an MCP message body");
            return Ok(None);
        }
        Err(e) => return Err(e),
    }
    Ok(Some((parse_payload(&payload), Framing::ContentLength)))
}

const CONTENT_LENGTH: &[u8] = b"content-length:";

fn is_content_length_header(line: &[u8]) -> bool {
    line.len() >= CONTENT_LENGTH.len()
        && line[..CONTENT_LENGTH.len()].eq_ignore_ascii_case(CONTENT_LENGTH)
}

fn parse_content_length(header: &[u8]) -> Option<usize> {
    std::str::from_utf8(&header[CONTENT_LENGTH.len()..])
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn parse_payload(bytes: &[u8]) -> Incoming {
    match serde_json::from_slice(bytes) {
        Ok(value) => Incoming::Message(value),
        Err(e) => Incoming::Malformed(format!("Invalid JSON payload: {e}")),
    }
}

async fn write_framed_json<W>(
    writer: &mut W,
    value: &Value,
    framing: Framing,
) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::Line => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
    }
    writer.flush().await?;
    Ok(())
}
