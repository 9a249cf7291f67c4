use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Failed to load configuration")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Connector(#[from] igloo_common::Error),

    #[error("Connector already registered: {0}")]
    DuplicateConnector(String),

    #[error("Connector not found: {0}")]
    ConnectorNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
