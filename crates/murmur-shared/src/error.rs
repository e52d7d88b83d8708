use thiserror::Error;

/// Failures reported by the remote feed collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Transport failed before a response arrived.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// 5xx-class response.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The item was mutated or deleted elsewhere.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not authenticated")]
    Unauthorized,

    /// A response arrived but could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::Timeout | ApiError::Server { .. }
        )
    }
}

/// Reasons a bearer credential could not be decoded into an identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Credential is empty")]
    Empty,

    #[error("Credential must have three dot-separated segments, found {0}")]
    Segments(usize),

    #[error("Payload is not valid base64url: {0}")]
    Base64(String),

    #[error("Payload is not valid JSON: {0}")]
    Json(String),

    #[error("Payload has no usable subject claim")]
    MissingSubject,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Could not determine application data directory")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
