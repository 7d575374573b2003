use crate::adapters::AdapterError;
use crate::diff::DiffError;
use crate::process::ProcessError;
use crate::shell::ParseError;
use thiserror::Error;

/// Errors from any layer of the engine, for callers that want one type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed diff: {0}")]
    Diff(#[from] DiffError),

    #[error("command template: {0}")]
    Template(#[from] ParseError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
