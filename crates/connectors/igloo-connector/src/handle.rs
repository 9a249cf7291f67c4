//! Opaque handles exchanged between the engine and a connector.
//!
//! Every handle is namespaced by the transaction handle it was issued under
//! (and through it, the connector id) and carries a connector-private payload
//! serialized with serde. The engine never inspects the payload; it only
//! ships it around and hands it back to the issuing connector.

use std::fmt::Debug;

use igloo_common::{ConnectorId, Error, Result, TransactionId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resolver::HandleKind;
use crate::transaction::ConnectorTransactionHandle;

static NULL_PAYLOAD: Value = Value::Null;

/// Bound for connector-private handle contents.
pub trait HandlePayload: Serialize + DeserializeOwned + Debug + Send + Sync + 'static {}

impl<T: Serialize + DeserializeOwned + Debug + Send + Sync + 'static> HandlePayload for T {}

/// Common surface of the four handle kinds, used by the serialization layer.
pub trait OpaqueHandle: Sized {
    const KIND: HandleKind;

    fn transaction(&self) -> &ConnectorTransactionHandle;

    fn payload(&self) -> &Value;

    fn from_parts(transaction: ConnectorTransactionHandle, payload: Value) -> Self;

    fn connector_id(&self) -> &ConnectorId {
        self.transaction().connector_id()
    }

    fn transaction_id(&self) -> TransactionId {
        self.transaction().transaction_id()
    }
}

impl OpaqueHandle for ConnectorTransactionHandle {
    const KIND: HandleKind = HandleKind::Transaction;

    fn transaction(&self) -> &ConnectorTransactionHandle {
        self
    }

    fn payload(&self) -> &Value {
        &NULL_PAYLOAD
    }

    fn from_parts(transaction: ConnectorTransactionHandle, _payload: Value) -> Self {
        transaction
    }
}

fn mismatch(
    kind: HandleKind,
    issued: &ConnectorTransactionHandle,
    presented: &ConnectorTransactionHandle,
) -> Error {
    let msg = format!(
        "{:?} handle issued under {} presented under {}",
        kind, issued, presented
    );
    match kind {
        HandleKind::Table => Error::UnknownTableHandle(msg),
        HandleKind::Column => Error::UnknownColumnHandle(msg),
        _ => Error::UnknownHandle(msg),
    }
}

/// Decodes the payload of `handle` after checking it was issued under
/// `transaction`. Structurally identical handles from another transaction are
/// rejected.
pub fn decode_handle<H, T>(handle: &H, transaction: &ConnectorTransactionHandle) -> Result<T>
where
    H: OpaqueHandle,
    T: DeserializeOwned,
{
    if handle.transaction() != transaction {
        return Err(mismatch(H::KIND, handle.transaction(), transaction));
    }
    serde_json::from_value(handle.payload().clone()).map_err(|e| {
        let issuer = transaction.connector_id();
        let msg = format!("payload not issued by {issuer}: {e}");
        match H::KIND {
            HandleKind::Table => Error::UnknownTableHandle(msg),
            HandleKind::Column => Error::UnknownColumnHandle(msg),
            _ => Error::UnknownHandle(msg),
        }
    })
}

/// A resolved table within one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHandle {
    transaction: ConnectorTransactionHandle,
    payload: Value,
}

impl TableHandle {
    pub fn new<T: Serialize>(
        transaction: &ConnectorTransactionHandle,
        payload: &T,
    ) -> Result<Self> {
        Ok(Self {
            transaction: transaction.clone(),
            payload: serde_json::to_value(payload)?,
        })
    }

    pub fn decode<T: DeserializeOwned>(
        &self,
        transaction: &ConnectorTransactionHandle,
    ) -> Result<T> {
        decode_handle(self, transaction)
    }
}

impl OpaqueHandle for TableHandle {
    const KIND: HandleKind = HandleKind::Table;

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
        }
    }
}

/// One column of a resolved table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnHandle {
    transaction: ConnectorTransactionHandle,
    payload: Value,
}

impl ColumnHandle {
    pub fn new<T: Serialize>(
        transaction: &ConnectorTransactionHandle,
        payload: &T,
    ) -> Result<Self> {
        Ok(Self {
            transaction: transaction.clone(),
            payload: serde_json::to_value(payload)?,
        })
    }

    pub fn decode<T: DeserializeOwned>(
        &self,
        transaction: &ConnectorTransactionHandle,
    ) -> Result<T> {
        decode_handle(self, transaction)
    }
}

impl OpaqueHandle for ColumnHandle {
    const KIND: HandleKind = HandleKind::Column;

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
        }
    }
}
