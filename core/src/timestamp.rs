use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static THREAD_TS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d{6}$").unwrap_or_else(|e| panic!("invalid thread_ts pattern: {e}"))
});

static MISSING_SEPARATOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{7,}$").unwrap_or_else(|e| panic!("invalid thread_ts pattern: {e}"))
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error(
        "'{field}' must be a timestamp like 1234567890.123456; insert a '.' before the last 6 digits (e.g. '{suggested}')"
    )]
    MissingSeparator {
        field: String,
        suggested: String,
    },
    #[error("'{field}' must be a timestamp like 1234567890.123456, got '{received}'")]
    Malformed { field: String, received: String },
}

/// A Slack message timestamp (`<seconds>.<6 digit sequence>`), which doubles
/// as the message id and, for a root message, the thread id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadTs(String);

impl ThreadTs {
    /// Validates `raw` as the value of argument `field`.
    pub fn parse(field: &str, raw: &str) -> Result<Self, TimestampError> {
        let trimmed = raw.trim();
        if THREAD_TS_PATTERN.is_match(trimmed) {
            return Ok(Self(trimmed.to_string()));
        }
        if MISSING_SEPARATOR_PATTERN.is_match(trimmed) {
            let (seconds, sequence) = trimmed.split_at(trimmed.len() - 6);
            return Err(TimestampError::MissingSeparator {
                field: field.to_string(),
                suggested: format!("{seconds}.{sequence}"),
            });
        }
        Err(TimestampError::Malformed {
            field: field.to_string(),
            received: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadTs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_six_digit_sequence() {
        let ts = ThreadTs::parse("thread_ts", "1234567890.123456").unwrap();
        assert_eq!(ts.as_str(), "1234567890.123456");
        assert_eq!(
            ThreadTs::parse("thread_ts", " 100.000001 ").unwrap().to_string(),
            "100.000001"
        );
    }

    #[test]
    fn missing_separator_suggests_corrected_value() {
        let err = ThreadTs::parse("thread_ts", "1234567890123456").unwrap_err();
        assert_eq!(
            err,
            TimestampError::MissingSeparator {
                field: "thread_ts".to_string(),
                suggested: "1234567890.123456".to_string(),
            }
        );
        assert!(err.to_string().contains("insert a '.'"));
        assert!(err.to_string().contains("1234567890.123456"));
    }

    #[test]
    fn rejects_wrong_sequence_width() {
        assert!(matches!(
            ThreadTs::parse("thread_ts", "1234567890.1234"),
            Err(TimestampError::Malformed { .. })
        ));
        assert!(matches!(
            ThreadTs::parse("timestamp", "abc"),
            Err(TimestampError::Malformed { .. })
        ));
    }
}
