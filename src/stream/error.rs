//! Stream error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Why a transport stopped. None of these are fatal; each one leads to a
/// scheduled reconnect.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Handshake failed.
    #[error("connect failed: {0}")]
    Connect(#[source] tungstenite::Error),

    /// Handshake did not finish in time.
    #[error("handshake timed out after {0} ms")]
    HandshakeTimeout(u64),

    /// Read or write on an open transport failed.
    #[error("transport error: {0}")]
    Transport(#[source] tungstenite::Error),

    /// Nothing was received for too long.
    #[error("no inbound traffic for {0} ms")]
    LivenessTimeout(u64),

    /// The server closed the stream.
    #[error("closed by server{}", .code.map(|c| format!(" (code {})", c)).unwrap_or_default())]
    RemoteClosed { code: Option<u16> },
}

/// Why an inbound message was dropped.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid JSON envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope has no type")]
    MissingType,

    #[error("unrecognised message type '{0}'")]
    UnknownType(String),

    #[error("invalid payload for '{kind}': {reason}")]
    InvalidData { kind: &'static str, reason: String },

    #[error("binary frames are not supported")]
    Binary,
}

impl EnvelopeError {
    /// Short label used for the dropped-message metric.
    pub fn reason(&self) -> &'static str {
        match self {
            EnvelopeError::Json(_) => "json",
            EnvelopeError::MissingType => "missing_type",
            EnvelopeError::UnknownType(_) => "unknown_type",
            EnvelopeError::InvalidData { .. } => "invalid_data",
            EnvelopeError::Binary => "binary",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StreamError::RemoteClosed { code: Some(1001) };
        assert_eq!(err.to_string(), "closed by server (code 1001)");

        let err = StreamError::RemoteClosed { code: None };
        assert_eq!(err.to_string(), "closed by server");

        let err = StreamError::HandshakeTimeout(10_000);
        assert_eq!(err.to_string(), "handshake timed out after 10000 ms");
    }

    #[test]
    fn test_envelope_reason_labels() {
        assert_eq!(EnvelopeError::MissingType.reason(), "missing_type");
        assert_eq!(EnvelopeError::UnknownType("bogus".into()).reason(), "unknown_type");
    }
}
