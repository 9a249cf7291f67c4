//! Connector SPI
//!
//! The contract between the engine and a data source: transactions, opaque
//! handles and their resolver, metadata, splits, page sources and system
//! tables.

pub mod connector;
pub mod handle;
pub mod metadata;
pub mod page_source;
pub mod resolver;
pub mod session;
pub mod split;
pub mod system_table;
pub mod transaction;

pub use connector::{Capabilities, Connector, ConnectorKind};
pub use handle::{ColumnHandle, HandlePayload, OpaqueHandle, TableHandle};
pub use metadata::ConnectorMetadata;
pub use page_source::{into_stream, MaterializedPageSource, PageSource, PageSourceProvider};
pub use resolver::{HandleKind, HandleResolver, HandleTypes, TypedHandleResolver};
pub use session::ConnectorSession;
pub use split::{drain_splits, FixedSplitSource, Split, SplitAddress, SplitManager, SplitSource};
pub use system_table::{Distribution, SystemTable};
pub use transaction::{check_isolation_level, ConnectorTransactionHandle, IsolationLevel};
