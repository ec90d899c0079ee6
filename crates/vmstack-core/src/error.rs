//! Resource graph error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid image reference '{0}', expected 'publisher:offer:sku:version'")]
    InvalidImageReference(String),

    #[error("unknown security type '{0}', expected 'Standard' or 'Trusted launch'")]
    UnknownSecurityType(String),

    #[error("duplicate resource in graph: {0}")]
    DuplicateResource(String),

    #[error("resource '{node}' depends on unknown resource '{dependency}'")]
    UnknownDependency { node: String, dependency: String },

    #[error("dependency cycle detected involving: {0}")]
    CycleDetected(String),

    #[error("export '{name}' references unknown resource '{node}'")]
    UnknownExportNode { name: String, node: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
