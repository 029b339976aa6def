use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// A single stream record could not be decoded. Never fatal to a turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed stream record: {reason}")]
    MalformedPayload { reason: String },
}

impl DecodeError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }
}

/// Transport failure for the chunk source, or the cancellation signal.
#[derive(Debug, Error)]
pub enum ChatApiError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("{0} is required to open a chat stream")]
    MissingIdentity(&'static str),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {0} {1}")]
    Status(StatusCode, String),
    #[error("request was cancelled")]
    Cancelled,
    #[error("stream closed unexpectedly: {0}")]
    StreamClosed(String),
}

impl ChatApiError {
    /// True for the cooperative cancellation signal, which is not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorFields>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorFields {
    Structured { message: Option<String> },
    Plain(String),
}

/// Build a readable message for a non-success response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let nested = match envelope.error {
            Some(ErrorFields::Structured { message }) => message,
            Some(ErrorFields::Plain(message)) => Some(message),
            None => None,
        };
        if let Some(message) = nested
            .or(envelope.message)
            .filter(|message| !message.trim().is_empty())
        {
            return message;
        }
    }

    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
