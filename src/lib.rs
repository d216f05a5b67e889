//! crudkit: declarative CRUD engine for a single relational table.
//!
//! A [`CrudService`] is configured once with a storage connector, a schema
//! provider, a table name and a field registry, then translates structured
//! requests (filter queries, record payloads) into parameterized SQL and
//! coerces values between the wire and storage representations.

pub mod coerce;
pub mod connector;
pub mod error;
pub mod registry;
pub mod sql;
pub mod service;

/// A record in either representation: field alias -> loosely-typed value.
pub type Record = serde_json::Map<String, serde_json::Value>;

pub use connector::{ColumnMeta, SchemaProvider, StorageConnector};
pub use connector::mysql::{MySqlConnector, MySqlSchemaProvider};
pub use connector::sqlite::{SqliteConnector, SqliteSchemaProvider};
pub use error::CrudError;
pub use registry::{FieldDescriptor, FieldRegistry, FieldType, WriteOp};
pub use service::{CrudService, Key};
