use thiserror::Error;

/// Why a stream session ended without a final answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    /// The upstream sent an explicit `{"error": ...}` record.
    #[error("{0}")]
    Upstream(String),

    /// The byte stream broke off mid-way (truncated or reset).
    #[error("stream interrupted: {0}")]
    Transport(String),

    #[error("no data received for {ms}ms")]
    IdleTimeout { ms: u64 },

    /// The relay refused the query before any streaming started.
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, TranscriptError>;
