use reqwest::StatusCode;
use serde_json::{Value, json};
use slack_mcp_core::timestamp::ThreadTs;
use tracing::debug;

use crate::config::{ConfigError, RuntimeConfig};
use crate::error::ToolError;
use crate::util::{client, parse_response_body};

/// Upper bound Slack accepts for `limit` on list endpoints.
pub const MAX_LIST_LIMIT: u32 = 200;

/// Thin façade over the Slack Web API. Each method issues exactly one HTTP
/// request and hands back the parsed body unchanged, including Slack's own
/// `ok`/`error` fields, which are never inspected here.
pub struct SlackClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    team_id: String,
}

impl SlackClient {
    pub fn new(config: &RuntimeConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http: client(config.http_timeout)?,
            api_url: config.api_url.clone(),
            token: config.token.clone(),
            team_id: config.team_id.clone(),
        })
    }

    pub async fn list_channels(
        &self,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Value, ToolError> {
        let mut query = vec![
            ("types", "public_channel".to_string()),
            ("exclude_archived", "true".to_string()),
            ("limit", limit.min(MAX_LIST_LIMIT).to_string()),
            ("team_id", self.team_id.clone()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        self.get("conversations.list", &query).await
    }

    pub async fn channel_info(&self, channel: &str) -> Result<Value, ToolError> {
        self.get("conversations.info", &[("channel", channel.to_string())])
            .await
    }

    pub async fn post_message(&self, channel: &str, text: &str) -> Result<Value, ToolError> {
        self.post_json(
            "chat.postMessage",
            json!({
                "channel": channel,
                "text": text
            }),
        )
        .await
    }

    pub async fn post_reply(
        &self,
        channel: &str,
        thread_ts: &ThreadTs,
        text: &str,
    ) -> Result<Value, ToolError> {
        self.post_json(
            "chat.postMessage",
            json!({
                "channel": channel,
                "thread_ts": thread_ts.as_str(),
                "text": text
            }),
        )
        .await
    }

    pub async fn add_reaction(
        &self,
        channel: &str,
        timestamp: &str,
        reaction: &str,
    ) -> Result<Value, ToolError> {
        self.post_json(
            "reactions.add",
            json!({
                "channel": channel,
                "timestamp": timestamp,
                "name": reaction
            }),
        )
        .await
    }

    pub async fn channel_history(&self, channel: &str, limit: u32) -> Result<Value, ToolError> {
        self.get(
            "conversations.history",
            &[
                ("channel", channel.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    pub async fn thread_replies(
        &self,
        channel: &str,
        thread_ts: &ThreadTs,
    ) -> Result<Value, ToolError> {
        self.get(
            "conversations.replies",
            &[
                ("channel", channel.to_string()),
                ("ts", thread_ts.to_string()),
            ],
        )
        .await
    }

    pub async fn list_users(
        &self,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Value, ToolError> {
        let mut query = vec![
            ("limit", limit.min(MAX_LIST_LIMIT).to_string()),
            ("team_id", self.team_id.clone()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        self.get("users.list", &query).await
    }

    pub async fn user_profile(&self, user: &str) -> Result<Value, ToolError> {
        self.get(
            "users.profile.get",
            &[
                ("user", user.to_string()),
                ("include_labels", "true".to_string()),
            ],
        )
        .await
    }

    pub async fn auth_test(&self) -> Result<Value, ToolError> {
        self.post_json("auth.test", json!({})).await
    }

    /// First upload phase. Slack only accepts form encoding here.
    pub async fn get_upload_url(
        &self,
        filename: &str,
        length: u64,
        title: Option<&str>,
    ) -> Result<Value, ToolError> {
        let mut form = vec![
            ("filename", filename.to_string()),
            ("length", length.to_string()),
        ];
        if let Some(title) = title {
            form.push(("title", title.to_string()));
        }
        self.post_form("files.getUploadURLExternal", &form).await
    }

    /// Second upload phase: raw bytes to the URL handed out by
    /// `files.getUploadURLExternal`. That URL is not a Web API method, so
    /// transport errors are handed back untouched.
    pub async fn upload_bytes(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
    ) -> Result<StatusCode, reqwest::Error> {
        debug!(bytes = bytes.len(), "uploading file content");
        let response = self
            .http
            .post(upload_url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        Ok(response.status())
    }

    pub async fn complete_upload(
        &self,
        file_id: &str,
        title: Option<&str>,
        channel_id: &str,
        thread_ts: &ThreadTs,
        initial_comment: Option<&str>,
    ) -> Result<Value, ToolError> {
        let mut file = json!({ "id": file_id });
        if let Some(title) = title {
            file["title"] = json!(title);
        }
        let mut body = json!({
            "files": [file],
            "channel_id": channel_id,
            "thread_ts": thread_ts.as_str()
        });
        if let Some(comment) = initial_comment {
            body["initial_comment"] = json!(comment);
        }
        self.post_json("files.completeUploadExternal", body).await
    }

    /// Starts a private file download. The caller owns status handling and
    /// body streaming.
    pub async fn download_file(&self, url: &str) -> Result<reqwest::Response, ToolError> {
        debug!(url, "downloading thread file");
        self.http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| ToolError::Http {
                method: "file download",
                source,
            })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.api_url, method)
    }

    async fn get(
        &self,
        method: &'static str,
        query: &[(&str, String)],
    ) -> Result<Value, ToolError> {
        debug!(method, "slack api GET");
        let request = self
            .http
            .get(self.endpoint(method))
            .bearer_auth(&self.token)
            .query(query);
        self.send(method, request).await
    }

    async fn post_json(&self, method: &'static str, body: Value) -> Result<Value, ToolError> {
        debug!(method, "slack api POST");
        let request = self
            .http
            .post(self.endpoint(method))
            .bearer_auth(&self.token)
            .json(&body);
        self.send(method, request).await
    }

    async fn post_form(
        &self,
        method: &'static str,
        form: &[(&str, String)],
    ) -> Result<Value, ToolError> {
        debug!(method, "slack api POST (form)");
        let request = self
            .http
            .post(self.endpoint(method))
            .bearer_auth(&self.token)
            .form(form);
        self.send(method, request).await
    }

    async fn send(
        &self,
        method: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, ToolError> {
        let response = request
            .send()
            .await
            .map_err(|source| ToolError::Http { method, source })?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ToolError::Http { method, source })?;
        Ok(parse_response_body(&bytes))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::slack;
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn list_channels_clamps_limit_and_sends_team() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/conversations.list")
                    .header("authorization", "Bearer xoxb-test")
                    .query_param("limit", "200")
                    .query_param("team_id", "T123")
                    .query_param("types", "public_channel")
                    .query_param("exclude_archived", "true");
                then.status(200)
                    .json_body(json!({ "ok": true, "channels": [] }));
            })
            .await;

        let body = slack(&server.base_url())
            .list_channels(500, None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body, json!({ "ok": true, "channels": [] }));
    }

    #[tokio::test]
    async fn list_users_forwards_cursor_and_clamps_limit() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/users.list")
                    .query_param("limit", "200")
                    .query_param("cursor", "dXNlcjpVMDYx");
                then.status(200).json_body(json!({ "ok": true, "members": [] }));
            })
            .await;

        slack(&server.base_url())
            .list_users(1000, Some("dXNlcjpVMDYx"))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn remote_errors_are_passed_through_untouched() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/reactions.add");
                then.status(200)
                    .json_body(json!({ "ok": false, "error": "already_reacted" }));
            })
            .await;

        let body = slack(&server.base_url())
            .add_reaction("C1", "100.000001", "thumbsup")
            .await
            .unwrap();

        assert_eq!(body, json!({ "ok": false, "error": "already_reacted" }));
    }

    #[tokio::test]
    async fn unreachable_api_is_an_http_error() {
        let err = slack("http://127.0.0.1:9")
            .user_profile("U1")
            .await
            .expect_err("nothing listens on port 9");
        assert!(matches!(
            err,
            ToolError::Http {
                method: "users.profile.get",
                ..
            }
        ));
    }
}
