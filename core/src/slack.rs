use serde::Deserialize;

/// The `ok`/`error` envelope every Slack Web API response carries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackEnvelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Extra explanation some endpoints attach to `invalid_arguments` style errors
    #[serde(default)]
    pub detail: Option<String>,
}

impl SlackEnvelope {
    pub fn error_or_unknown(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "unknown_error".to_string())
    }
}

/// Response of `conversations.replies`. Only the fields the download protocol
/// needs are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadReplies {
    #[serde(flatten)]
    pub envelope: SlackEnvelope,
    #[serde(default)]
    pub messages: Vec<SlackMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackMessage {
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub files: Vec<SlackFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackFile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url_private: Option<String>,
    #[serde(default)]
    pub url_private_download: Option<String>,
}

/// A file attached to a thread message, as seen by the download protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadFileRef {
    pub remote_url: String,
    pub suggested_name: String,
}

impl ThreadFileRef {
    fn from_file(file: &SlackFile) -> Option<Self> {
        let remote_url = file
            .url_private_download
            .as_deref()
            .or(file.url_private.as_deref())
            .filter(|url| !url.is_empty())?;
        let suggested_name = [&file.name, &file.title, &file.id]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())?;
        Some(Self {
            remote_url: remote_url.to_string(),
            suggested_name: suggested_name.clone(),
        })
    }
}

/// Message order first, then attachment order within a message. Files without
/// a download URL or any usable name are skipped.
pub fn thread_file_refs(messages: &[SlackMessage]) -> Vec<ThreadFileRef> {
    messages
        .iter()
        .flat_map(|message| message.files.iter())
        .filter_map(ThreadFileRef::from_file)
        .collect()
}

/// Response of `files.getUploadURLExternal`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadUrlResponse {
    #[serde(flatten)]
    pub envelope: SlackEnvelope,
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
}

/// Single-use upload handle. It is not `Clone`: the transfer step takes it by
/// value, so a session can never be replayed.
#[derive(Debug, PartialEq, Eq)]
pub struct UploadSession {
    pub upload_target_url: String,
    pub remote_file_id: String,
}

impl UploadUrlResponse {
    /// `None` when the response claims success but lacks the URL or file id.
    pub fn into_session(self) -> Option<UploadSession> {
        match (self.upload_url, self.file_id) {
            (Some(upload_target_url), Some(remote_file_id)) => Some(UploadSession {
                upload_target_url,
                remote_file_id,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn thread_file_refs_follow_message_then_attachment_order() {
        let replies: ThreadReplies = serde_json::from_value(json!({
            "ok": true,
            "messages": [
                { "ts": "1.000001", "files": [
                    { "id": "F1", "name": "one.txt", "url_private": "https://files/1" },
                    { "id": "F2", "name": "two.txt", "url_private_download": "https://files/2/download", "url_private": "https://files/2" }
                ]},
                { "ts": "1.000002", "text": "no files here" },
                { "ts": "1.000003", "files": [
                    { "id": "F3", "title": "Three", "url_private": "https://files/3" }
                ]}
            ]
        }))
        .unwrap();

        let refs = thread_file_refs(&replies.messages);
        let names: Vec<_> = refs.iter().map(|r| r.suggested_name.as_str()).collect();
        assert_eq!(names, vec!["one.txt", "two.txt", "Three"]);
        assert_eq!(refs[1].remote_url, "https://files/2/download");
    }

    #[test]
    fn files_without_url_are_skipped() {
        let message: SlackMessage = serde_json::from_value(json!({
            "files": [{ "id": "F9", "name": "tombstone", "mode": "tombstone" }]
        }))
        .unwrap();
        assert!(thread_file_refs(&[message]).is_empty());
    }

    #[test]
    fn upload_response_without_file_id_has_no_session() {
        let response: UploadUrlResponse =
            serde_json::from_value(json!({ "ok": true, "upload_url": "https://up" })).unwrap();
        assert!(response.into_session().is_none());
    }

    #[test]
    fn envelope_reports_unknown_error_when_missing() {
        let envelope: SlackEnvelope = serde_json::from_value(json!({ "ok": false })).unwrap();
        assert_eq!(envelope.error_or_unknown(), "unknown_error");
    }
}
