use slack_mcp_core::timestamp::TimestampError;
use thiserror::Error;

/// Every way a tool invocation can fail. The dispatcher is the only place
/// these are rendered for the caller, always via `Display`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("No arguments provided")]
    NoArguments,
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Missing required arguments: {}", join_field_names(.0))]
    MissingArguments(Vec<&'static str>),
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error("Slack API call {method} failed: {source}")]
    Http {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Output folder does not exist: {0}")]
    OutputFolderMissing(String),
    #[error("Failed to fetch thread replies: {0}")]
    ThreadFetch(String),
    #[error("Failed to download {name}: {reason}")]
    Download { name: String, reason: String },

    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Upload negotiation failed: {}", with_detail(.error, .detail.as_deref()))]
    UploadNegotiate {
        error: String,
        detail: Option<String>,
    },
    #[error("Upload transfer failed: {0}")]
    UploadTransfer(String),
    #[error("Upload finalize failed: {0}")]
    UploadFinalize(String),

    #[error("Tool '{0}' failed unexpectedly")]
    Panicked(String),
}

impl ToolError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// `a`, `a and b`, `a, b and c`.
pub fn join_field_names(fields: &[&str]) -> String {
    match fields {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

fn with_detail(error: &str, detail: Option<&str>) -> String {
    match detail {
        Some(detail) if !detail.trim().is_empty() => format!("{error} ({detail})"),
        _ => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_field_names_reads_naturally() {
        assert_eq!(join_field_names(&["text"]), "text");
        assert_eq!(
            join_field_names(&["channel_id", "text"]),
            "channel_id and text"
        );
        assert_eq!(
            join_field_names(&["channel_id", "thread_ts", "text"]),
            "channel_id, thread_ts and text"
        );
    }

    #[test]
    fn missing_arguments_message_names_fields() {
        let err = ToolError::MissingArguments(vec!["channel_id", "text"]);
        assert_eq!(
            err.to_string(),
            "Missing required arguments: channel_id and text"
        );
    }

    #[test]
    fn panicked_tool_is_not_reported_as_bad_input() {
        let err = ToolError::Panicked("get_users".to_string());
        assert_eq!(err.to_string(), "Tool 'get_users' failed unexpectedly");
        assert!(!matches!(err, ToolError::InvalidArgument(_)));
    }

    #[test]
    fn negotiate_error_carries_remote_detail() {
        let err = ToolError::UploadNegotiate {
            error: "invalid_arguments".to_string(),
            detail: Some("length must be positive".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Upload negotiation failed: invalid_arguments (length must be positive)"
        );
    }
}
