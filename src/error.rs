//! Error types for the to-do store.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TodoError>;

#[derive(Debug, Error)]
pub enum TodoError {
    /// No item with this id exists at the time of the call.
    #[error("to-do item {0} not found")]
    NotFound(u64),

    /// Backing file exists but does not hold a valid collection.
    #[error("backing file {} is corrupt: {source}", path.display())]
    StorageCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem failure while reading, writing or locking.
    #[error("storage unavailable ({context}): {source}")]
    StorageUnavailable {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Every id up to `u64::MAX` is taken, so none is left to assign.
    #[error("no to-do id left after {0}")]
    IdsExhausted(u64),

    /// Client input rejected before reaching the store.
    #[error("invalid item: {0}")]
    Invalid(String),
}

impl TodoError {
    pub fn unavailable(context: impl Into<String>, source: std::io::Error) -> Self {
        TodoError::StorageUnavailable {
            context: context.into(),
            source,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        TodoError::Invalid(msg.into())
    }

    /// Stable code for logs and programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            TodoError::NotFound(_) => "NOT_FOUND",
            TodoError::StorageCorrupt { .. } => "STORAGE_CORRUPT",
            TodoError::StorageUnavailable { .. } => "STORAGE_UNAVAILABLE",
            TodoError::IdsExhausted(_) => "IDS_EXHAUSTED",
            TodoError::Invalid(_) => "INVALID",
        }
    }
}
