//! Error taxonomy and user-facing messages.
//!
//! `Display` output is the short localized text shown to the user. Raw
//! provider bodies stay in the `body` field so callers can log them without
//! leaking them into the UI.

use std::fmt;

/// Shown when an explain request is made with empty input.
pub const NO_CODE: &str = "コードを入力してください";
/// Shown when a diff explain request is missing either side.
pub const NO_DIFF_CODE: &str = "前後のコードが必要です";
/// Shown when no API key is configured.
pub const NO_API_KEY: &str =
    "OpenAI APIキーが設定されていません。右上の入力欄にAPIキーを入力してください";
/// Generic fallback message.
pub const API_ERROR: &str = "エラーが発生しました";
/// Shown when the response stream could not be read.
pub const STREAM_ERROR: &str = "レスポンスの読み取りに失敗しました";
/// Shown when the model judged a generation prompt invalid.
pub const INVALID_GENERATION_REQUEST: &str = "適切なコード生成の指示を入力してください";

/// Maximum characters of provider body included in display output.
const DISPLAY_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub enum CoachError {
    /// Synchronous input validation failure. Never reaches the network.
    Validation(String),
    /// No API key available from the store or the environment. Checked
    /// before any network call.
    MissingCredential,
    /// HTTP failure: a non-success status (with the raw body) or a
    /// connection/read error (no status, error text in `body`).
    Transport { status: Option<u16>, body: String },
}

impl CoachError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoachError::Validation(message.into())
    }

    /// Non-success HTTP status with the raw response body.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        CoachError::Transport {
            status: Some(status),
            body: body.into(),
        }
    }

    /// Transport failure below the HTTP layer (connect, read, decode).
    pub fn network(detail: impl Into<String>) -> Self {
        CoachError::Transport {
            status: None,
            body: detail.into(),
        }
    }

    /// Status code for transport errors, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            CoachError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl fmt::Display for CoachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoachError::Validation(message) => write!(f, "{}", message),
            CoachError::MissingCredential => write!(f, "{}", NO_API_KEY),
            CoachError::Transport {
                status: Some(status),
                body,
            } => write!(
                f,
                "OpenAI API error: {} - {}",
                status,
                truncate_chars(body, DISPLAY_BODY_LIMIT)
            ),
            CoachError::Transport { status: None, .. } => write!(f, "{}", STREAM_ERROR),
        }
    }
}

impl std::error::Error for CoachError {}

impl From<reqwest::Error> for CoachError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => CoachError::api(status.as_u16(), err.to_string()),
            None => CoachError::network(err.to_string()),
        }
    }
}

/// Truncate a string for display (Unicode-safe).
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> &str {
    if s.chars().count() <= max_chars {
        s
    } else {
        let byte_idx = s
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        &s[..byte_idx]
    }
}
