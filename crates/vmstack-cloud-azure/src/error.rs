//! Azure backend error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("az CLI not found. Please install: https://aka.ms/azure-cli")]
    AzNotFound,

    #[error("az authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("az command failed: {0}")]
    CommandFailed(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("resource property missing: {0}")]
    MissingProperty(String),

    #[error("unsupported resource kind for this backend: {0}")]
    UnsupportedKind(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("cloud error: {0}")]
    CloudError(#[from] vmstack_cloud::CloudError),
}

pub type Result<T> = std::result::Result<T, AzureError>;
