use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    MissingInput(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    DecodeError(String),
    #[error("{0}")]
    InferenceError(String),
    #[error("not found: {0}")]
    NotFound(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
