use std::collections::VecDeque;
use std::fmt::Debug;

use async_trait::async_trait;
use igloo_common::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::handle::{decode_handle, OpaqueHandle, TableHandle};
use crate::resolver::HandleKind;
use crate::session::ConnectorSession;
use crate::transaction::ConnectorTransactionHandle;

/// Placement hints for a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitAddress {
    /// Whether any worker can read the split, or only the listed addresses.
    pub remotely_accessible: bool,
    pub addresses: Vec<String>,
}

impl Default for SplitAddress {
    fn default() -> Self {
        Self {
            remotely_accessible: true,
            addresses: Vec::new(),
        }
    }
}

impl SplitAddress {
    /// Only readable on the coordinator that holds the data.
    pub fn local(address: impl Into<String>) -> Self {
        Self {
            remotely_accessible: false,
            addresses: vec![address.into()],
        }
    }
}

/// A Split is an opaque handle to a unit of work for a connector.
/// For a filesystem, this would be a single file or byte range.
/// For a database, it could be a query or a range of primary keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    transaction: ConnectorTransactionHandle,
    payload: Value,
    address: SplitAddress,
}

impl Split {
    pub fn new<T: Serialize>(
        transaction: &ConnectorTransactionHandle,
        payload: &T,
    ) -> Result<Self> {
        Ok(Self {
            transaction: transaction.clone(),
            payload: serde_json::to_value(payload)?,
            address: SplitAddress::default(),
        })
    }

    pub fn with_address(mut self, address: SplitAddress) -> Self {
        self.address = address;
        self
    }

    pub fn address(&self) -> &SplitAddress {
        &self.address
    }

    pub fn decode<T: DeserializeOwned>(
        &self,
        transaction: &ConnectorTransactionHandle,
    ) -> Result<T> {
        decode_handle(self, transaction)
    }
}

impl OpaqueHandle for Split {
    const KIND: HandleKind = HandleKind::Split;

    fn transaction(&self) -> &ConnectorTransactionHandle {
        &self.transaction
    }

    fn payload(&self) -> &Value {
        &self.payload
    }

    fn from_parts(transaction: ConnectorTransactionHandle, payload: Value) -> Self {
        Self {
            transaction,
            payload,
            address: SplitAddress::default(),
        }
    }
}

/// A pull-based, possibly lazily produced sequence of splits.
///
/// Callers may stop pulling at any time and must then call `close`.
#[async_trait]
pub trait SplitSource: Debug + Send {
    /// Returns up to `max_size` splits. May return fewer (including zero)
    /// before the source is finished.
    async fn next_batch(&mut self, max_size: usize) -> Result<Vec<Split>>;

    fn is_finished(&self) -> bool;

    fn close(&mut self);
}

/// Decomposes a table into splits for parallel scanning.
///
/// The splits of one table never overlap and together address every row of
/// the table as of the transaction's snapshot.
#[async_trait]
pub trait SplitManager: Debug + Send + Sync {
    async fn get_splits(
        &self,
        transaction: &ConnectorTransactionHandle,
        session: &ConnectorSession,
        table: &TableHandle,
    ) -> Result<Box<dyn SplitSource>>;
}

/// Split source over a precomputed list.
#[derive(Debug)]
pub struct FixedSplitSource {
    splits: VecDeque<Split>,
    closed: bool,
}

impl FixedSplitSource {
    pub fn new(splits: Vec<Split>) -> Self {
        Self {
            splits: splits.into(),
            closed: false,
        }
    }
}

#[async_trait]
impl SplitSource for FixedSplitSource {
    async fn next_batch(&mut self, max_size: usize) -> Result<Vec<Split>> {
        if self.closed {
            return Ok(Vec::new());
        }
        let n = max_size.min(self.splits.len());
        Ok(self.splits.drain(..n).collect())
    }

    fn is_finished(&self) -> bool {
        self.closed || self.splits.is_empty()
    }

    fn close(&mut self) {
        self.closed = true;
        self.splits.clear();
    }
}

/// Pulls every split out of `source` in batches of `batch_size`, then closes it.
pub async fn drain_splits(
    source: &mut dyn SplitSource,
    batch_size: usize,
) -> Result<Vec<Split>> {
    let batch_size = batch_size.max(1);
    let mut splits = Vec::new();
    while !source.is_finished() {
        match source.next_batch(batch_size).await {
            Ok(batch) => splits.extend(batch),
            Err(e) => {
                source.close();
                return Err(e);
            }
        }
    }
    source.close();
    debug!(splits = splits.len(), "drained split source");
    Ok(splits)
}
