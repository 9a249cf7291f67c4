use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use igloo_common::{ConnectorId, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::handle::HandlePayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Table,
    Column,
    Split,
    Transaction,
}

/// The concrete payload types a connector encodes into its handles.
pub trait HandleTypes: Send + Sync + 'static {
    type Table: HandlePayload;
    type Column: HandlePayload;
    type Split: HandlePayload;
    /// Extra state attached to a transaction handle, `()` when the handle is
    /// identity only.
    type Transaction: HandlePayload;
}

/// Describes how one connector's handles are encoded so a serialization
/// layer can decode them after they cross a process boundary.
///
/// Implementations are pure metadata about types.
pub trait HandleResolver: fmt::Debug + Send + Sync {
    fn connector_id(&self) -> &ConnectorId;

    /// Name of the concrete payload type used for `kind`.
    fn type_name(&self, kind: HandleKind) -> &'static str;

    /// Checks that `payload` decodes into the connector's type for `kind`.
    fn validate(&self, kind: HandleKind, payload: &Value) -> Result<()>;
}

/// `HandleResolver` derived from a `HandleTypes` declaration.
pub struct TypedHandleResolver<H> {
    connector_id: ConnectorId,
    _types: PhantomData<fn() -> H>,
}

impl<H: HandleTypes> TypedHandleResolver<H> {
    pub fn new(connector_id: ConnectorId) -> Self {
        Self {
            connector_id,
            _types: PhantomData,
        }
    }
}

impl<H> fmt::Debug for TypedHandleResolver<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedHandleResolver")
            .field("connector_id", &self.connector_id)
            .field("types", &type_name::<H>())
            .finish()
    }
}

fn check<T: HandlePayload>(
    connector_id: &ConnectorId,
    kind: HandleKind,
    payload: &Value,
) -> Result<()> {
    let ty = type_name::<T>();
    serde_json::from_value::<T>(payload.clone())
        .map(|_| ())
        .map_err(|e| {
            Error::UnknownHandle(format!(
                "{kind:?} payload is not a {ty} for connector {connector_id}: {e}"
            ))
        })
}

impl<H: HandleTypes> HandleResolver for TypedHandleResolver<H> {
    fn connector_id(&self) -> &ConnectorId {
        &self.connector_id
    }

    fn type_name(&self, kind: HandleKind) -> &'static str {
        match kind {
            HandleKind::Table => type_name::<H::Table>(),
            HandleKind::Column => type_name::<H::Column>(),
            HandleKind::Split => type_name::<H::Split>(),
            HandleKind::Transaction => type_name::<H::Transaction>(),
        }
    }

    fn validate(&self, kind: HandleKind, payload: &Value) -> Result<()> {
        match kind {
            HandleKind::Table => check::<H::Table>(&self.connector_id, kind, payload),
            HandleKind::Column => check::<H::Column>(&self.connector_id, kind, payload),
            HandleKind::Split => check::<H::Split>(&self.connector_id, kind, payload),
            HandleKind::Transaction => check::<H::Transaction>(&self.connector_id, kind, payload),
        }
    }
}
