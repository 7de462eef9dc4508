//! Error types for the linplayer-remote library.

use std::io;

/// Result type alias for linplayer-remote operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while serving or persisting remote-control state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request read timed out")]
    ReadTimeout,

    #[error("Response write timed out")]
    WriteTimeout,

    #[error("Store error: {0}")]
    Store(String),
}

/// Reasons a server entry is rejected.
///
/// The `Display` text is sent verbatim as the `error` field of API replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing baseUrl")]
    MissingBaseUrl,

    #[error("missing username")]
    MissingUsername,

    #[error("missing token")]
    MissingToken,

    #[error("missing apiKey/token")]
    MissingApiKey,
}

/// A failure reported by a [`Player`](crate::bridge::Player) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PlayerError(pub String);

impl PlayerError {
    pub fn new(message: impl Into<String>) -> Self {
        PlayerError(message.into())
    }
}
