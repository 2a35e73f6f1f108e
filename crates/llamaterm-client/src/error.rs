//! Client error types.
//!
//! Every fatal condition the client can hit surfaces through [`ClientError`].
//! Framing noise inside an SSE stream is never an error; see
//! [`crate::streaming`].

use serde::Deserialize;

/// Unified error type for the chat-completion client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // -- Transport -----------------------------------------------------------
    /// The request never produced an HTTP status (DNS, refused connection,
    /// timeout, or the body could not be read on the buffered path).
    #[error("request failed: {reason}")]
    Transport { reason: String },

    /// The server answered with a non-2xx status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    // -- Decoding ------------------------------------------------------------
    /// A 2xx body did not have the expected envelope shape.
    #[error("failed to decode response: {reason}")]
    Decode { reason: String },

    /// Reading a streamed body failed part way through.
    #[error("error reading stream: {reason}")]
    StreamRead { reason: String },

    // -- Configuration -------------------------------------------------------
    /// The HTTP client could not be constructed.
    #[error("client config error: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the client crate.
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// HTTP status carried by an [`ClientError::Api`] error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayloadFields {
    message: Option<String>,
}

/// Extract a human-readable message from an error response body.
///
/// Prefers `error.message` from an OpenAI-style `{"error": {...}}` payload and
/// falls back to the raw body text verbatim.
pub fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error)
        .and_then(|fields| fields.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.to_owned())
}
