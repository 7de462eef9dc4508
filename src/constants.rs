//! Shared constants and enumerations.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-connection bound on reading one complete request.
pub const READ_TIMEOUT: Duration = Duration::from_secs(7);

/// Per-connection bound on writing the response.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(7);

/// Pause after a failed accept before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How long a status bridge call waits for the scheduler.
pub const STATUS_TIMEOUT: Duration = Duration::from_millis(250);

/// How long a control bridge call waits for the scheduler.
pub const CONTROL_TIMEOUT: Duration = Duration::from_millis(600);

/// How long `stop` waits for the accept loop to finish.
pub const STOP_JOIN_TIMEOUT: Duration = Duration::from_millis(800);

/// Request and header lines are cut at this many bytes.
pub const MAX_LINE_BYTES: usize = 8192;

/// Length of generated access tokens.
pub const TOKEN_LENGTH: usize = 10;

/// Alphabet used for generated access tokens.
pub const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Media backend kinds a server entry can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    #[default]
    Emby,
    Jellyfin,
    Plex,
    Webdav,
}

impl ServerType {
    pub const ALL: [ServerType; 4] = [
        ServerType::Emby,
        ServerType::Jellyfin,
        ServerType::Plex,
        ServerType::Webdav,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Emby => "emby",
            ServerType::Jellyfin => "jellyfin",
            ServerType::Plex => "plex",
            ServerType::Webdav => "webdav",
        }
    }

    /// Case-insensitive lookup; surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        ServerType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    /// Like [`ServerType::parse`], falling back to `default` for unknown values.
    pub fn parse_or(s: &str, default: ServerType) -> Self {
        ServerType::parse(s).unwrap_or(default)
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player pipeline states, as reported by the attached player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Buffering,
    Ready,
    Ended,
}
