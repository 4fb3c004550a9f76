use std::io;
use thiserror::Error;

use crate::config::ConfigError;
use crate::query::{ModelError, ParseError};
use crate::value::ValueFormatError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Failures raised by index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corruption detected: {0}")]
    Corruption(String),
    #[error("invalid full-text expression: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    ValueFormat(#[from] ValueFormatError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("property '{property}' is not indexed by '{index}'")]
    UnknownProperty { index: String, property: String },
    #[error("no value bound to variable '${0}'")]
    MissingVariable(String),
    #[error("invalid index definition: {0}")]
    InvalidDefinition(String),
    #[error("stored index '{0}' was written with a different definition")]
    DefinitionMismatch(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("index '{0}' has been shut down")]
    Closed(String),
}
