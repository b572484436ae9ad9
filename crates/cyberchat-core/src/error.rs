use thiserror::Error;

#[derive(Debug, Error)]
pub enum CyberchatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream unreachable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream returned {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    /// The upstream accepted the request but its body failed mid-transfer.
    #[error("Upstream stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Upstream idle for {ms}ms")]
    Timeout { ms: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CyberchatError {
    /// Short machine-readable error code, logged next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            CyberchatError::Config(_) => "CONFIG_ERROR",
            CyberchatError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            CyberchatError::UpstreamStatus { .. } => "UPSTREAM_STATUS",
            CyberchatError::StreamInterrupted(_) => "STREAM_INTERRUPTED",
            CyberchatError::Serialization(_) => "SERIALIZATION_ERROR",
            CyberchatError::Timeout { .. } => "TIMEOUT",
            CyberchatError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CyberchatError>;
