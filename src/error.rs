use thiserror::Error;

/// Errors raised by descriptor extraction and similarity search
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Empty, zero-sized or malformed pixel data
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Query issued against an index with no rows
    #[error("dataset is empty")]
    EmptyDataset,

    /// Feature vectors derived with different extraction parameters
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
