//! Common crate
//!
//! Shared identities, catalog descriptors and error handling for Igloo.
//!
//! # Example
//! ```rust
//! use igloo_common::{ConnectorId, SchemaTableName};
//! let id = ConnectorId::new("system").unwrap();
//! let name = SchemaTableName::new("", "nodes");
//! assert_eq!(id.as_str(), "system");
//! assert_eq!(name.schema(), None);
//! ```

pub mod catalog;
pub mod error;
pub mod ids;

pub use catalog::{ColumnMetadata, ConnectorTableMetadata, SchemaTableName, SchemaTablePrefix};
pub use error::{Error, Result};
pub use ids::{ConnectorId, TransactionId};
