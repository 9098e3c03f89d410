//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("root directory does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error("directory does not exist below root: {0}")]
    MissingDirectory(PathBuf),

    #[error("extension '{input}' is already mapped to '{existing}' (use force to replace)")]
    DuplicateExtension { input: String, existing: String },

    #[error("filter '{name}' is already registered (use force to replace)")]
    DuplicateFilter { name: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("warning raised as error: {0}")]
    Warning(String),

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
