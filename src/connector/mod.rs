//! Storage connector and schema provider boundaries. The engine owns no
//! connection discipline; it issues parameterized statements and record maps
//! through these traits and interprets nothing beyond the returned rows.

use crate::error::CrudError;
use crate::Record;
use async_trait::async_trait;
use serde_json::Value;

pub mod mysql;
pub mod sqlite;

/// One column as described by the schema provider.
#[derive(Clone, Debug)]
pub struct ColumnMeta {
    pub name: String,
    /// Driver-native type string, e.g. "tinyint(1)", "varchar(100)".
    pub native_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
}

/// Executes parameterized SQL against one database.
#[async_trait]
pub trait StorageConnector: Send + Sync {
    /// Run a statement; returns the affected row count.
    async fn execute(&self, sql: &str, binds: &[Value]) -> Result<u64, CrudError>;

    async fn fetch_all(&self, sql: &str, binds: &[Value]) -> Result<Vec<Record>, CrudError>;

    /// First column of the first row, or null when no row matched.
    async fn fetch_scalar(&self, sql: &str, binds: &[Value]) -> Result<Value, CrudError>;

    /// Identifier generated by the most recent insert through this connector.
    async fn last_insert_id(&self) -> Result<Value, CrudError>;

    /// Insert one record (storage column name -> value).
    async fn insert(&self, table: &str, record: &Record) -> Result<u64, CrudError>;

    /// Update rows matching `where_map` (AND-combined equality).
    async fn update(&self, table: &str, record: &Record, where_map: &Record)
        -> Result<u64, CrudError>;

    /// Delete rows matching `where_map` (AND-combined equality).
    async fn delete(&self, table: &str, where_map: &Record) -> Result<u64, CrudError>;
}

/// Resolves column metadata for a table. Implementations cache per table
/// name for process lifetime; entries are idempotent and never invalidated.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn columns_of(&self, table: &str) -> Result<Vec<ColumnMeta>, CrudError>;

    /// All primary-key columns, in schema order.
    async fn identifier_of(&self, table: &str) -> Result<Vec<String>, CrudError> {
        Ok(self
            .columns_of(table)
            .await?
            .into_iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name)
            .collect())
    }
}
