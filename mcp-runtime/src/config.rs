use std::fmt;
use std::time::Duration;

use clap::Args;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://slack.com/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SLACK_BOT_TOKEN is not set. Pass --token or export SLACK_BOT_TOKEN.")]
    MissingToken,
    #[error("SLACK_TEAM_ID is not set. Pass --team-id or export SLACK_TEAM_ID.")]
    MissingTeamId,
    #[error("Invalid Slack API URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Connection settings shared by every subcommand.
#[derive(Args, Clone, Debug)]
pub struct ConnectionArgs {
    /// Slack bot token (xoxb-...)
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Slack workspace (team) id
    #[arg(long, env = "SLACK_TEAM_ID")]
    pub team_id: Option<String>,
    /// Slack Web API base URL
    #[arg(long, env = "SLACK_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
    /// Restrict list_channels to these channel ids (comma separated)
    #[arg(long, env = "SLACK_CHANNEL_IDS", value_delimiter = ',')]
    pub channel_ids: Vec<String>,
    /// Per-request timeout for Slack HTTP calls. Unset means no timeout.
    #[arg(long, env = "SLACK_MCP_HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: Option<u64>,
}

/// Validated process configuration. Fixed at startup and never mutated.
#[derive(Clone)]
pub struct RuntimeConfig {
    pub api_url: String,
    pub token: String,
    pub team_id: String,
    pub channel_ids: Vec<String>,
    pub http_timeout: Option<Duration>,
}

impl RuntimeConfig {
    pub fn from_args(args: ConnectionArgs) -> Result<Self, ConfigError> {
        let token = non_empty(args.token).ok_or(ConfigError::MissingToken)?;
        let team_id = non_empty(args.team_id).ok_or(ConfigError::MissingTeamId)?;

        let api_url = args.api_url.trim().trim_end_matches('/').to_string();
        reqwest::Url::parse(&api_url).map_err(|e| ConfigError::InvalidApiUrl {
            url: args.api_url.clone(),
            reason: e.to_string(),
        })?;

        let channel_ids = args
            .channel_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            api_url,
            token,
            team_id,
            channel_ids,
            http_timeout: args
                .http_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("team_id", &self.team_id)
            .field("channel_ids", &self.channel_ids)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
