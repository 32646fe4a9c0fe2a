use std::time::Duration;

use {serde::Deserialize, thiserror::Error};

/// Error codes that mean the session is gone or the account may not proceed.
const FATAL_ERRCODES: &[&str] = &[
    "M_UNKNOWN_TOKEN",
    "M_MISSING_TOKEN",
    "M_FORBIDDEN",
    "M_USER_DEACTIVATED",
];

const MAX_BODY_IN_ERROR: usize = 512;

#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced a usable HTTP response.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The homeserver answered with a non-success status.
    #[error("homeserver returned {status}: {message}")]
    Api {
        status: u16,
        errcode: Option<String>,
        message: String,
        retry_after_ms: Option<u64>,
    },

    /// A success response whose body did not match the expected shape.
    #[error("malformed homeserver response: {source}")]
    InvalidResponse {
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct ErrorBody {
    errcode: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    retry_after_ms: Option<u64>,
}

impl Error {
    /// Build an [`Error::Api`] from a non-success status and its raw body.
    ///
    /// Bodies in the standard `{"errcode": ..., "error": ...}` shape are
    /// unpacked; anything else is kept verbatim (truncated).
    #[must_use]
    pub fn from_response(status: reqwest::StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) => {
                let message = match parsed.error {
                    Some(detail) => format!("{}: {detail}", parsed.errcode),
                    None => parsed.errcode.clone(),
                };
                Self::Api {
                    status: status.as_u16(),
                    errcode: Some(parsed.errcode),
                    message,
                    retry_after_ms: parsed.retry_after_ms,
                }
            },
            Err(_) => {
                let mut message = String::from_utf8_lossy(body).trim().to_string();
                if message.len() > MAX_BODY_IN_ERROR {
                    let mut cut = MAX_BODY_IN_ERROR;
                    while !message.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    message.truncate(cut);
                    message.push('…');
                }
                if message.is_empty() {
                    message = status
                        .canonical_reason()
                        .unwrap_or("no response body")
                        .to_string();
                }
                Self::Api {
                    status: status.as_u16(),
                    errcode: None,
                    message,
                    retry_after_ms: None,
                }
            },
        }
    }

    /// Whether the sync loop must stop instead of polling again.
    ///
    /// Authentication and permission failures, and client errors other than
    /// request timeout and rate limiting, are fatal. Transport failures,
    /// server errors and malformed bodies are recoverable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_builder(),
            Self::Api {
                status, errcode, ..
            } => {
                if errcode
                    .as_deref()
                    .is_some_and(|code| FATAL_ERRCODES.contains(&code))
                {
                    return true;
                }
                if errcode.as_deref() == Some("M_LIMIT_EXCEEDED") {
                    return false;
                }
                match *status {
                    401 => true,
                    408 | 429 => false,
                    400..=499 => true,
                    _ => false,
                }
            },
            Self::InvalidResponse { .. } => false,
        }
    }

    /// Server-imposed wait before the next request, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api {
                retry_after_ms: Some(ms),
                ..
            } => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }

    /// The Matrix `errcode`, when the homeserver sent one.
    #[must_use]
    pub fn errcode(&self) -> Option<&str> {
        match self {
            Self::Api { errcode, .. } => errcode.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
