use std::time::Duration;

use serde_json::Value;

pub fn client(timeout: Option<Duration>) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("slack-mcp/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

/// JSON bodies are returned as-is; anything else becomes a JSON string so
/// callers always receive a value.
pub fn parse_response_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).to_string()))
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_response_body_handles_json_text_and_empty() {
        assert_eq!(parse_response_body(br#"{"ok":true}"#), json!({ "ok": true }));
        assert_eq!(parse_response_body(b"upstream timeout"), json!("upstream timeout"));
        assert_eq!(parse_response_body(b""), Value::Null);
    }
}
