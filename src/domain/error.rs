//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent structural and registration violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node at location '{segment}' in '{path}' does not exist")]
    PathNotFound { segment: String, path: String },

    #[error("node for location '{path}' already exists")]
    AlreadyExists { path: String },

    #[error("name '{name}' is already used for a child node")]
    ChildExists { name: String },

    #[error("node is no longer part of the tree")]
    StaleNode,

    #[error("cannot join locations with separators '{left}' and '{right}'")]
    SeparatorMismatch { left: char, right: char },

    #[error("invalid location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("invalid file pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("rule '{rule}' is not a valid generation rule: {reason}")]
    MalformedRule { rule: String, reason: String },

    #[error("default rule already registered: {existing}")]
    DuplicateDefaultRule { existing: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
