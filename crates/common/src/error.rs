use arrow::error::ArrowError;
use thiserror::Error;

/// Unified error type for Igloo crates.
#[derive(Debug, Error)]
pub enum Error {
    #[error("An unknown error occurred: {0}")]
    Unknown(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Connector {connector} does not support isolation level {requested} (max {supported})")]
    InvalidIsolationLevel {
        connector: String,
        requested: String,
        supported: String,
    },
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    // Contract violations: a handle was presented to a connector or transaction
    // that did not issue it.
    #[error("Unknown table handle: {0}")]
    UnknownTableHandle(String),
    #[error("Unknown column handle: {0}")]
    UnknownColumnHandle(String),
    #[error("Unknown handle: {0}")]
    UnknownHandle(String),
    #[error("Column does not belong to the split's table: {0}")]
    UnsupportedColumn(String),
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Handle encoding error: {0}")]
    HandleEncoding(#[from] serde_json::Error),
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(msg: &str) -> Self {
        Error::Unknown(msg.to_string())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Error::NotSupported(msg.into())
    }

    /// True for failures caused by the caller handing over a handle that was
    /// not issued by the callee. These are never retried.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::UnknownTableHandle(_)
                | Error::UnknownColumnHandle(_)
                | Error::UnknownHandle(_)
                | Error::UnsupportedColumn(_)
                | Error::UnknownTransaction(_)
        )
    }
}
