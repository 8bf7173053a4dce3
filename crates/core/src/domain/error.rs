// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Metadata parse error at line {line}: {reason}")]
    MetadataParse { line: usize, reason: String },

    #[error("Unsupported statement at line {line}: {statement}")]
    UnsupportedStatement { line: usize, statement: String },

    #[error("Invalid path value: {0}")]
    InvalidPathValue(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
