use thiserror::Error;

/// Errors talking to the traffic HTTP API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server answered but reported `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("invalid API url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status, when the server answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
