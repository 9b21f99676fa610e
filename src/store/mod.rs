//! Data-store boundary: the opaque query/command interface the engine reads
//! and writes through.
//!
//! The store itself is an external collaborator. The engine only knows this
//! trait; production wires in [`http::HttpStore`] against the remote API,
//! tests wire in [`memory::MemoryStore`].

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Column equality predicate for a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: &str, value: &str) -> Self {
        Self {
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}

/// Result ordering for a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: true,
        }
    }

    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
        }
    }
}

/// Query/command interface of the backing store.
///
/// Rows cross this boundary as raw JSON objects; the repository layer maps
/// them into read-model entities. Schema and table names are the store's
/// contract, not the engine's.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Read rows matching every filter, optionally ordered.
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Patch fields on the row with the given id. Single atomic update.
    async fn update(&self, table: &str, id: &str, fields: Value) -> Result<(), StoreError>;

    /// Insert one record.
    async fn insert(&self, table: &str, record: Value) -> Result<(), StoreError>;

    /// Call a named server-side procedure.
    async fn rpc(&self, name: &str, params: Value) -> Result<Value, StoreError>;
}
