use std::path::PathBuf;

use serde_json::{Map, Value};
use slack_mcp_core::timestamp::ThreadTs;

use crate::error::ToolError;
use crate::tools::ToolName;

pub const DEFAULT_LIST_LIMIT: u32 = 100;
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

/// Loosely typed `tools/call` arguments. Checked against a tool's required
/// field set, then projected into that tool's [`ToolRequest`].
#[derive(Debug, Clone, Default)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Required fields that are absent, `null`, or blank strings, in the
    /// order they were declared.
    pub fn missing(&self, required: &[&'static str]) -> Vec<&'static str> {
        required
            .iter()
            .copied()
            .filter(|key| match self.0.get(*key) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .collect()
    }

    fn required_string(&self, key: &str) -> Result<String, ToolError> {
        match self.0.get(key) {
            Some(Value::String(v)) if !v.trim().is_empty() => Ok(v.clone()),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                Err(ToolError::invalid(format!("'{key}' must not be empty")))
            }
            Some(_) => Err(ToolError::invalid(format!("'{key}' must be a string"))),
        }
    }

    fn optional_string(&self, key: &str) -> Result<Option<String>, ToolError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
            Some(Value::String(v)) => Ok(Some(v.clone())),
            Some(_) => Err(ToolError::invalid(format!("'{key}' must be a string"))),
        }
    }

    /// Accepts numbers and numeric strings; clients are inconsistent here.
    fn optional_u32(&self, key: &str) -> Result<Option<u32>, ToolError> {
        let invalid = || ToolError::invalid(format!("'{key}' must be a positive integer"));
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .map(Some)
                .ok_or_else(invalid),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .map(Some)
                .ok_or_else(invalid),
            Some(_) => Err(invalid()),
        }
    }

    fn thread_ts(&self, key: &str) -> Result<ThreadTs, ToolError> {
        let raw = self.required_string(key)?;
        Ok(ThreadTs::parse(key, &raw)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChannelsParams {
    pub limit: u32,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMessageParams {
    pub channel_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyToThreadParams {
    pub channel_id: String,
    pub thread_ts: ThreadTs,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddReactionParams {
    pub channel_id: String,
    pub timestamp: String,
    pub reaction: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHistoryParams {
    pub channel_id: String,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRepliesParams {
    pub channel_id: String,
    pub thread_ts: ThreadTs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetUsersParams {
    pub limit: u32,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfileParams {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadThreadFilesParams {
    pub channel_id: String,
    pub thread_ts: ThreadTs,
    pub output_folder: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFileParams {
    pub channel_id: String,
    pub thread_ts: ThreadTs,
    pub file_path: PathBuf,
    pub title: Option<String>,
    pub initial_comment: Option<String>,
}

/// A validated, strongly typed tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    ListChannels(ListChannelsParams),
    PostMessage(PostMessageParams),
    ReplyToThread(ReplyToThreadParams),
    AddReaction(AddReactionParams),
    GetChannelHistory(ChannelHistoryParams),
    GetThreadReplies(ThreadRepliesParams),
    GetUsers(GetUsersParams),
    GetUserProfile(UserProfileParams),
    DownloadThreadFiles(DownloadThreadFilesParams),
    UploadFileToThread(UploadFileParams),
}

impl ToolRequest {
    pub fn from_args(tool: ToolName, args: &ToolArgs) -> Result<Self, ToolError> {
        Ok(match tool {
            ToolName::ListChannels => Self::ListChannels(ListChannelsParams {
                limit: args.optional_u32("limit")?.unwrap_or(DEFAULT_LIST_LIMIT),
                cursor: args.optional_string("cursor")?,
            }),
            ToolName::PostMessage => Self::PostMessage(PostMessageParams {
                channel_id: args.required_string("channel_id")?,
                text: args.required_string("text")?,
            }),
            ToolName::ReplyToThread => Self::ReplyToThread(ReplyToThreadParams {
                channel_id: args.required_string("channel_id")?,
                thread_ts: args.thread_ts("thread_ts")?,
                text: args.required_string("text")?,
            }),
            ToolName::AddReaction => Self::AddReaction(AddReactionParams {
                channel_id: args.required_string("channel_id")?,
                timestamp: args.required_string("timestamp")?,
                reaction: args.required_string("reaction")?,
            }),
            ToolName::GetChannelHistory => Self::GetChannelHistory(ChannelHistoryParams {
                channel_id: args.required_string("channel_id")?,
                limit: args
                    .optional_u32("limit")?
                    .unwrap_or(DEFAULT_HISTORY_LIMIT),
            }),
            ToolName::GetThreadReplies => Self::GetThreadReplies(ThreadRepliesParams {
                channel_id: args.required_string("channel_id")?,
                thread_ts: args.thread_ts("thread_ts")?,
            }),
            ToolName::GetUsers => Self::GetUsers(GetUsersParams {
                limit: args.optional_u32("limit")?.unwrap_or(DEFAULT_LIST_LIMIT),
                cursor: args.optional_string("cursor")?,
            }),
            ToolName::GetUserProfile => Self::GetUserProfile(UserProfileParams {
                user_id: args.required_string("user_id")?,
            }),
            ToolName::DownloadThreadFiles => {
                Self::DownloadThreadFiles(DownloadThreadFilesParams {
                    channel_id: args.required_string("channel_id")?,
                    thread_ts: args.thread_ts("thread_ts")?,
                    output_folder: PathBuf::from(args.required_string("output_folder")?),
                })
            }
            ToolName::UploadFileToThread => Self::UploadFileToThread(UploadFileParams {
                channel_id: args.required_string("channel_id")?,
                thread_ts: args.thread_ts("thread_ts")?,
                file_path: PathBuf::from(args.required_string("file_path")?),
                title: args.optional_string("title")?,
                initial_comment: args.optional_string("initial_comment")?,
            }),
        })
    }
}
