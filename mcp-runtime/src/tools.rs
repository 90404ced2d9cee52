use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ListChannels,
    PostMessage,
    ReplyToThread,
    AddReaction,
    GetChannelHistory,
    GetThreadReplies,
    GetUsers,
    GetUserProfile,
    DownloadThreadFiles,
    UploadFileToThread,
}

impl ToolName {
    /// Catalog order, as advertised by `tools/list`.
    pub const ALL: [ToolName; 10] = [
        ToolName::ListChannels,
        ToolName::PostMessage,
        ToolName::ReplyToThread,
        ToolName::AddReaction,
        ToolName::GetChannelHistory,
        ToolName::GetThreadReplies,
        ToolName::GetUsers,
        ToolName::GetUserProfile,
        ToolName::DownloadThreadFiles,
        ToolName::UploadFileToThread,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::ListChannels => "list_channels",
            ToolName::PostMessage => "post_message",
            ToolName::ReplyToThread => "reply_to_thread",
            ToolName::AddReaction => "add_reaction",
            ToolName::GetChannelHistory => "get_channel_history",
            ToolName::GetThreadReplies => "get_thread_replies",
            ToolName::GetUsers => "get_users",
            ToolName::GetUserProfile => "get_user_profile",
            ToolName::DownloadThreadFiles => "download_thread_files",
            ToolName::UploadFileToThread => "upload_file_to_thread",
        }
    }

    pub fn resolve(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            ToolName::ListChannels | ToolName::GetUsers => &[],
            ToolName::PostMessage => &["channel_id", "text"],
            ToolName::ReplyToThread => &["channel_id", "thread_ts", "text"],
            ToolName::AddReaction => &["channel_id", "timestamp", "reaction"],
            ToolName::GetChannelHistory => &["channel_id"],
            ToolName::GetThreadReplies => &["channel_id", "thread_ts"],
            ToolName::GetUserProfile => &["user_id"],
            ToolName::DownloadThreadFiles => &["channel_id", "thread_ts", "output_folder"],
            ToolName::UploadFileToThread => &["channel_id", "thread_ts", "file_path"],
        }
    }

    fn description(self) -> &'static str {
        match self {
            ToolName::ListChannels => "List public channels in the workspace with pagination.",
            ToolName::PostMessage => "Post a new message to a Slack channel.",
            ToolName::ReplyToThread => "Reply to a specific message thread in Slack.",
            ToolName::AddReaction => "Add a reaction emoji to a message.",
            ToolName::GetChannelHistory => "Get recent messages from a channel.",
            ToolName::GetThreadReplies => "Get all replies in a message thread.",
            ToolName::GetUsers => {
                "Get a list of all users in the workspace with their basic profile information."
            }
            ToolName::GetUserProfile => "Get detailed profile information for a specific user.",
            ToolName::DownloadThreadFiles => {
                "Download every file attached to a message thread into an existing local folder."
            }
            ToolName::UploadFileToThread => {
                "Upload a local file into a message thread, optionally with a title and comment."
            }
        }
    }

    fn properties(self) -> Value {
        let channel_id = json!({
            "type": "string",
            "description": "The ID of the channel"
        });
        let thread_ts = json!({
            "type": "string",
            "description": THREAD_TS_DESCRIPTION
        });
        match self {
            ToolName::ListChannels => json!({
                "limit": {
                    "type": "number",
                    "description": "Maximum number of channels to return (default 100, max 200)",
                    "default": 100
                },
                "cursor": {
                    "type": "string",
                    "description": "Pagination cursor for next page of results"
                }
            }),
            ToolName::PostMessage => json!({
                "channel_id": {
                    "type": "string",
                    "description": "The ID of the channel to post to"
                },
                "text": { "type": "string", "description": "The message text to post" }
            }),
            ToolName::ReplyToThread => json!({
                "channel_id": {
                    "type": "string",
                    "description": "The ID of the channel containing the thread"
                },
                "thread_ts": thread_ts,
                "text": { "type": "string", "description": "The reply text" }
            }),
            ToolName::AddReaction => json!({
                "channel_id": {
                    "type": "string",
                    "description": "The ID of the channel containing the message"
                },
                "timestamp": {
                    "type": "string",
                    "description": "The timestamp of the message to react to"
                },
                "reaction": {
                    "type": "string",
                    "description": "The name of the emoji reaction (without ::)"
                }
            }),
            ToolName::GetChannelHistory => json!({
                "channel_id": channel_id,
                "limit": {
                    "type": "number",
                    "description": "Number of messages to retrieve (default 10)",
                    "default": 10
                }
            }),
            ToolName::GetThreadReplies => json!({
                "channel_id": {
                    "type": "string",
                    "description": "The ID of the channel containing the thread"
                },
                "thread_ts": thread_ts
            }),
            ToolName::GetUsers => json!({
                "cursor": {
                    "type": "string",
                    "description": "Pagination cursor for next page of results"
                },
                "limit": {
                    "type": "number",
                    "description": "Maximum number of users to return (default 100, max 200)",
                    "default": 100
                }
            }),
            ToolName::GetUserProfile => json!({
                "user_id": { "type": "string", "description": "The ID of the user" }
            }),
            ToolName::DownloadThreadFiles => json!({
                "channel_id": channel_id,
                "thread_ts": thread_ts,
                "output_folder": {
                    "type": "string",
                    "description": "Existing local folder the files are written into"
                }
            }),
            ToolName::UploadFileToThread => json!({
                "channel_id": channel_id,
                "thread_ts": thread_ts,
                "file_path": {
                    "type": "string",
                    "description": "Path of the local file to upload"
                },
                "title": { "type": "string", "description": "Optional file title" },
                "initial_comment": {
                    "type": "string",
                    "description": "Optional message posted alongside the file"
                }
            }),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), self.properties());
        schema.insert("required".to_string(), json!(self.required_fields()));
        ToolDefinition {
            name: self.as_str(),
            description: self.description(),
            input_schema: Value::Object(schema),
            required: self.required_fields(),
        }
    }
}

const THREAD_TS_DESCRIPTION: &str = "The timestamp of the parent message in the format '1234567890.123456'. Timestamps without the period can be converted by adding the period such that 6 numbers come after it.";

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub required: &'static [&'static str],
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.into_iter().map(ToolName::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_is_stable() {
        let names: Vec<_> = tool_definitions().iter().map(|tool| tool.name).collect();
        assert_eq!(
            names,
            vec![
                "list_channels",
                "post_message",
                "reply_to_thread",
                "add_reaction",
                "get_channel_history",
                "get_thread_replies",
                "get_users",
                "get_user_profile",
                "download_thread_files",
                "upload_file_to_thread",
            ]
        );
    }

    #[test]
    fn resolve_round_trips_every_name_and_rejects_unknown() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::resolve(tool.as_str()), Some(tool));
        }
        assert_eq!(ToolName::resolve("delete_channel"), None);
        assert_eq!(ToolName::resolve("LIST_CHANNELS"), None);
    }

    #[test]
    fn schema_required_matches_required_fields_and_properties() {
        for tool in tool_definitions() {
            let required: Vec<&str> = tool.input_schema["required"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap())
                .collect();
            assert_eq!(required, tool.required, "{}", tool.name);

            let properties = tool.input_schema["properties"].as_object().unwrap();
            for field in tool.required {
                assert!(properties.contains_key(*field), "{} lacks {field}", tool.name);
            }
        }
    }
}
