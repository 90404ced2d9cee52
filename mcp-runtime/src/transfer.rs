use std::collections::HashSet;
use std::fmt::Display;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use futures::{Stream, StreamExt};
use futures::future::join_all;
use regex::Regex;
use serde_json::Value;
use slack_mcp_core::slack::{
    ThreadFileRef, ThreadReplies, UploadSession, UploadUrlResponse, thread_file_refs,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::args::{DownloadThreadFilesParams, UploadFileParams};
use crate::error::ToolError;
use crate::gateway::SlackClient;

static UNSAFE_FILE_NAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[/\\?%*:|"<>]"#).unwrap_or_else(|e| panic!("invalid file name pattern: {e}"))
});

pub fn sanitize_file_name(name: &str) -> String {
    UNSAFE_FILE_NAME_CHARS.replace_all(name, "_").into_owned()
}

/// Sanitized local names, one per file and pairwise distinct. A name already
/// taken gets `_2`, `_3`, ... inserted before its extension.
pub fn local_file_names(files: &[ThreadFileRef]) -> Vec<String> {
    let mut taken = HashSet::with_capacity(files.len());
    files
        .iter()
        .map(|file| {
            let base = sanitize_file_name(&file.suggested_name);
            let (stem, ext) = match base.rfind('.') {
                Some(dot) if dot > 0 => base.split_at(dot),
                _ => (base.as_str(), ""),
            };
            let mut candidate = base.clone();
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{stem}_{n}{ext}");
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Downloads every file attached to the thread into `output_folder`.
///
/// All downloads run concurrently and are awaited together. If any fails the
/// whole operation fails with the first failure in thread order; files that
/// did finish stay on disk. The returned paths follow thread order, not
/// completion order, and never repeat.
pub async fn download_thread_files(
    slack: &SlackClient,
    params: &DownloadThreadFilesParams,
) -> Result<Vec<PathBuf>, ToolError> {
    let output_folder = params.output_folder.as_path();
    let is_dir = tokio::fs::metadata(output_folder)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(ToolError::OutputFolderMissing(
            output_folder.display().to_string(),
        ));
    }

    let body = slack
        .thread_replies(&params.channel_id, &params.thread_ts)
        .await?;
    let replies: ThreadReplies = serde_json::from_value(body)
        .map_err(|e| ToolError::ThreadFetch(format!("unexpected response shape: {e}")))?;
    if !replies.envelope.ok {
        return Err(ToolError::ThreadFetch(replies.envelope.error_or_unknown()));
    }

    let files = thread_file_refs(&replies.messages);
    info!(
        channel = %params.channel_id,
        thread_ts = %params.thread_ts,
        files = files.len(),
        "downloading thread files"
    );

    let names = local_file_names(&files);
    let outcomes = join_all(
        files
            .iter()
            .zip(names)
            .map(|(file, name)| download_one(slack, file, output_folder.join(name))),
    )
    .await;
    outcomes.into_iter().collect()
}

async fn download_one(
    slack: &SlackClient,
    file: &ThreadFileRef,
    path: PathBuf,
) -> Result<PathBuf, ToolError> {
    let failed = |reason: String| ToolError::Download {
        name: file.suggested_name.clone(),
        reason,
    };

    let response = slack
        .download_file(&file.remote_url)
        .await
        .map_err(|e| failed(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        warn!(name = %file.suggested_name, %status, "thread file download rejected");
        return Err(failed(format!("HTTP {status}")));
    }

    if let Err(reason) = save_stream(response.bytes_stream(), &path).await {
        warn!(name = %file.suggested_name, %reason, "thread file download aborted");
        return Err(failed(reason));
    }

    debug!(path = %path.display(), "thread file written");
    Ok(path)
}

/// Writes `body` to `path`. On any stream or write error the partial file
/// is removed.
async fn save_stream<S, B, E>(body: S, path: &Path) -> Result<(), String>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let result = write_stream(body, path).await;
    if result.is_err() {
        // Best effort; the stream error is what gets reported.
        let _ = tokio::fs::remove_file(path).await;
    }
    result
}

async fn write_stream<S, B, E>(body: S, path: &Path) -> Result<(), String>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut out = tokio::fs::File::create(path)
        .await
        .map_err(|e| format!("cannot create {}: {e}", path.display()))?;
    let mut body = std::pin::pin!(body);
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| format!("stream interrupted: {e}"))?;
        out.write_all(chunk.as_ref())
            .await
            .map_err(|e| format!("write failed: {e}"))?;
    }
    out.flush().await.map_err(|e| format!("write failed: {e}"))
}

/// Uploads a local file into a thread: negotiate an upload session, push the
/// bytes, then attach the uploaded file to the thread. No phase is retried.
/// The finalize response is returned as Slack sent it.
pub async fn upload_file_to_thread(
    slack: &SlackClient,
    params: &UploadFileParams,
) -> Result<Value, ToolError> {
    let path_display = params.file_path.display().to_string();
    let bytes = match tokio::fs::read(&params.file_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ToolError::FileNotFound(path_display));
        }
        Err(source) => {
            return Err(ToolError::ReadFile {
                path: path_display,
                source,
            });
        }
    };
    let filename = params
        .file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ToolError::invalid(format!("'{path_display}' has no file name")))?;

    let length = bytes.len() as u64;
    let session = negotiate(slack, &filename, length, params.title.as_deref()).await?;
    let file_id = transfer(slack, session, bytes).await?;
    info!(file_id = %file_id, channel = %params.channel_id, "file uploaded, attaching to thread");

    slack
        .complete_upload(
            &file_id,
            params.title.as_deref(),
            &params.channel_id,
            &params.thread_ts,
            params.initial_comment.as_deref(),
        )
        .await
        .map_err(|e| ToolError::UploadFinalize(e.to_string()))
}

async fn negotiate(
    slack: &SlackClient,
    filename: &str,
    length: u64,
    title: Option<&str>,
) -> Result<UploadSession, ToolError> {
    let body = slack
        .get_upload_url(filename, length, title)
        .await
        .map_err(|e| ToolError::UploadNegotiate {
            error: e.to_string(),
            detail: None,
        })?;
    let response: UploadUrlResponse =
        serde_json::from_value(body).map_err(|e| ToolError::UploadNegotiate {
            error: "unexpected response shape".to_string(),
            detail: Some(e.to_string()),
        })?;
    if !response.envelope.ok {
        return Err(ToolError::UploadNegotiate {
            error: response.envelope.error_or_unknown(),
            detail: response.envelope.detail.clone(),
        });
    }
    response.into_session().ok_or_else(|| ToolError::UploadNegotiate {
        error: "missing upload_url or file_id".to_string(),
        detail: None,
    })
}

/// Consumes the session: whatever happens here, it is never used again.
async fn transfer(
    slack: &SlackClient,
    session: UploadSession,
    bytes: Vec<u8>,
) -> Result<String, ToolError> {
    let UploadSession {
        upload_target_url,
        remote_file_id,
    } = session;
    let status = slack
        .upload_bytes(&upload_target_url, bytes)
        .await
        .map_err(|source| ToolError::UploadTransfer(source.to_string()))?;
    if !status.is_success() {
        return Err(ToolError::UploadTransfer(status.to_string()));
    }
    Ok(remote_file_id)
}
