use serde::Serialize;

/// Body of every failed tool call. Callers tell success from failure by the
/// presence of `error`, not by a transport-level signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    /// Human/agent-readable description of what went wrong
    pub error: String,
}

impl ErrorPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
