use thiserror::Error;

/// Errors that can occur during conversation store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested conversation does not exist.
    #[error("conversation not found: {id}")]
    NotFound { id: String },

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A message role other than user/assistant/system.
    #[error("invalid role: {0}")]
    InvalidRole(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
