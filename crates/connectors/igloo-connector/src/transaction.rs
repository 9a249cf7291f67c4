use std::fmt;
use std::str::FromStr;

use igloo_common::{ConnectorId, Error, Result, TransactionId};
use serde::{Deserialize, Serialize};

/// Transaction isolation levels, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Whether a connector providing `self` satisfies a request for `required`.
    pub fn meets_requirement_of(self, required: IsolationLevel) -> bool {
        self >= required
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ_UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ_COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE_READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IsolationLevel {
    type Err = Error;

    /// Accepts both `READ_COMMITTED` and the SQL spelling `read committed`.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace(' ', "_");
        match normalized.as_str() {
            "READ_UNCOMMITTED" => Ok(IsolationLevel::ReadUncommitted),
            "READ_COMMITTED" => Ok(IsolationLevel::ReadCommitted),
            "REPEATABLE_READ" => Ok(IsolationLevel::RepeatableRead),
            "SERIALIZABLE" => Ok(IsolationLevel::Serializable),
            _ => {
                let msg = format!("unknown isolation level '{s}'");
                Err(Error::InvalidIdentifier(msg))
            }
        }
    }
}

/// Fails with `InvalidIsolationLevel` unless `supported` satisfies `requested`.
pub fn check_isolation_level(
    connector_id: &ConnectorId,
    supported: IsolationLevel,
    requested: IsolationLevel,
) -> Result<()> {
    if supported.meets_requirement_of(requested) {
        return Ok(());
    }
    Err(Error::InvalidIsolationLevel {
        connector: connector_id.to_string(),
        requested: requested.to_string(),
        supported: supported.to_string(),
    })
}

/// Per-connector token scoping all metadata, split and page calls to one
/// engine transaction. Carries identity only; dropping it releases nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorTransactionHandle {
    connector_id: ConnectorId,
    transaction_id: TransactionId,
}

impl ConnectorTransactionHandle {
    pub fn new(connector_id: ConnectorId, transaction_id: TransactionId) -> Self {
        Self {
            connector_id,
            transaction_id,
        }
    }

    pub fn connector_id(&self) -> &ConnectorId {
        &self.connector_id
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Rejects handles issued by a different connector.
    pub fn check_connector(&self, expected: &ConnectorId) -> Result<()> {
        if &self.connector_id != expected {
            return Err(Error::UnknownHandle(format!(
                "transaction handle for connector {} presented to connector {}",
                self.connector_id, expected
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ConnectorTransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.connector_id, self.transaction_id)
    }
}
