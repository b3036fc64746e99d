use thiserror::Error;

use memctl_core::level::UsageLevel;

/// Result type local to memctl-exec.
pub type Result<T> = std::result::Result<T, WriteError>;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("write rejected at memory level '{level}': requested {requested} bytes")]
    Rejected { level: UsageLevel, requested: u64 },

    #[error("flush failed: {0}")]
    Flush(String),

    #[error("invalid write: {0}")]
    InvalidInput(String),
}
