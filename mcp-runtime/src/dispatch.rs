use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use serde_json::{Value, json};
use slack_mcp_core::error::ErrorPayload;
use tracing::{info, warn};

use crate::args::{ListChannelsParams, ToolArgs, ToolRequest};
use crate::error::ToolError;
use crate::gateway::SlackClient;
use crate::tools::ToolName;
use crate::transfer;
use crate::util::to_pretty_json;

/// One `tools/call` as received from the client.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub tool_name: String,
    pub arguments: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    Success(Value),
    Failure(String),
}

impl InvocationResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, InvocationResult::Failure(_))
    }

    /// MCP tool result: exactly one text item carrying the payload, or
    /// `{"error": message}` for failures.
    pub fn into_tool_content(self) -> Value {
        let text = match self {
            InvocationResult::Success(payload) => to_pretty_json(&payload),
            InvocationResult::Failure(message) => {
                serde_json::to_value(ErrorPayload::new(message))
                    .map(|value| to_pretty_json(&value))
                    .unwrap_or_else(|_| "{}".to_string())
            }
        };
        json!({
            "content": [{ "type": "text", "text": text }]
        })
    }
}

/// Validates, routes, and executes tool calls. `invoke` never fails: every
/// outcome, including a panicking executor, comes back as an
/// [`InvocationResult`].
pub struct Dispatcher {
    slack: SlackClient,
    channel_ids: Vec<String>,
}

impl Dispatcher {
    pub fn new(slack: SlackClient, channel_ids: Vec<String>) -> Self {
        Self { slack, channel_ids }
    }

    pub async fn invoke(&self, request: InvocationRequest) -> InvocationResult {
        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.try_invoke(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(ToolError::Panicked(request.tool_name.clone())));
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(payload) => {
                info!(tool = %request.tool_name, elapsed_ms, "tool call succeeded");
                InvocationResult::Success(payload)
            }
            Err(err) => {
                warn!(tool = %request.tool_name, elapsed_ms, error = %err, "tool call failed");
                InvocationResult::Failure(err.to_string())
            }
        }
    }

    async fn try_invoke(&self, request: &InvocationRequest) -> Result<Value, ToolError> {
        let arguments = match &request.arguments {
            None | Some(Value::Null) => return Err(ToolError::NoArguments),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(ToolError::invalid("Tool arguments must be a JSON object"));
            }
        };
        let tool = ToolName::resolve(&request.tool_name)
            .ok_or_else(|| ToolError::UnknownTool(request.tool_name.clone()))?;

        let args = ToolArgs::new(arguments);
        let missing = args.missing(tool.required_fields());
        if !missing.is_empty() {
            return Err(ToolError::MissingArguments(missing));
        }

        let request = ToolRequest::from_args(tool, &args)?;
        self.execute(request).await
    }

    async fn execute(&self, request: ToolRequest) -> Result<Value, ToolError> {
        let slack = &self.slack;
        match request {
            ToolRequest::ListChannels(params) => self.list_channels(&params).await,
            ToolRequest::PostMessage(params) => {
                slack.post_message(&params.channel_id, &params.text).await
            }
            ToolRequest::ReplyToThread(params) => {
                slack
                    .post_reply(&params.channel_id, &params.thread_ts, &params.text)
                    .await
            }
            ToolRequest::AddReaction(params) => {
                slack
                    .add_reaction(&params.channel_id, &params.timestamp, &params.reaction)
                    .await
            }
            ToolRequest::GetChannelHistory(params) => {
                slack
                    .channel_history(&params.channel_id, params.limit)
                    .await
            }
            ToolRequest::GetThreadReplies(params) => {
                slack
                    .thread_replies(&params.channel_id, &params.thread_ts)
                    .await
            }
            ToolRequest::GetUsers(params) => {
                slack
                    .list_users(params.limit, params.cursor.as_deref())
                    .await
            }
            ToolRequest::GetUserProfile(params) => slack.user_profile(&params.user_id).await,
            ToolRequest::DownloadThreadFiles(params) => {
                let paths = transfer::download_thread_files(slack, &params).await?;
                Ok(Value::Array(
                    paths
                        .iter()
                        .map(|path| Value::String(path.display().to_string()))
                        .collect(),
                ))
            }
            ToolRequest::UploadFileToThread(params) => {
                transfer::upload_file_to_thread(slack, &params).await
            }
        }
    }

    /// With a configured channel allow-list, channels are looked up one by
    /// one instead of paging `conversations.list`; `limit` and `cursor` do not
    /// apply in that mode.
    async fn list_channels(&self, params: &ListChannelsParams) -> Result<Value, ToolError> {
        if self.channel_ids.is_empty() {
            return self
                .slack
                .list_channels(params.limit, params.cursor.as_deref())
                .await;
        }

        let mut channels = Vec::with_capacity(self.channel_ids.len());
        for id in &self.channel_ids {
            let body = self.slack.channel_info(id).await?;
            let ok = body.get("ok").and_then(Value::as_bool).unwrap_or(false);
            let Some(channel) = body.get("channel").filter(|_| ok) else {
                warn!(channel = %id, "configured channel could not be resolved");
                continue;
            };
            if channel.get("is_archived").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            channels.push(channel.clone());
        }
        Ok(json!({
            "ok": true,
            "channels": channels,
            "response_metadata": { "next_cursor": "" }
        }))
    }
}
