//! Cloud backend and orchestration error types

use thiserror::Error;

/// Cloud orchestration errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("backend operation failed: {0}")]
    ApiError(String),

    #[error("resource '{node}' references unresolved output '{attr}' of '{referenced}'")]
    UnresolvedReference {
        node: String,
        attr: String,
        referenced: String,
    },

    #[error("state file error: {0}")]
    StateError(String),

    #[error("lock acquisition failed: {0}")]
    LockError(String),

    #[error("stack '{0}' still has recorded resources, destroy it before removing")]
    StackNotEmpty(String),

    #[error("resource graph error: {0}")]
    Graph(#[from] vmstack_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
