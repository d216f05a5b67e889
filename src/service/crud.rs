//! Generic CRUD execution: each action is a fixed pipeline of policy
//! checks, coercion, persistence and read-back, terminal on first failure.

use crate::coerce;
use crate::connector::{SchemaProvider, StorageConnector};
use crate::error::CrudError;
use crate::registry::{FieldRegistry, ResolvedFields, WriteOp};
use crate::service::validation::check_writable;
use crate::sql;
use crate::Record;
use serde_json::Value;
use std::sync::Arc;

type Validator = Box<dyn Fn(&Record, Option<&Key>) -> Result<(), CrudError> + Send + Sync>;
type Transform = Box<dyn Fn(Record) -> Record + Send + Sync>;
type RecordHook = Box<dyn Fn(&Record) + Send + Sync>;

/// Identifier argument for single-row actions. A scalar binds against a
/// single-column identifier; composite keys pass an explicit mapping.
#[derive(Clone, Debug)]
pub enum Key {
    Scalar(Value),
    Composite(Record),
}

impl From<i64> for Key {
    fn from(id: i64) -> Self {
        Key::Scalar(Value::Number(id.into()))
    }
}

impl From<&str> for Key {
    fn from(id: &str) -> Self {
        Key::Scalar(Value::String(id.to_string()))
    }
}

impl From<Value> for Key {
    fn from(id: Value) -> Self {
        Key::Scalar(id)
    }
}

impl From<Record> for Key {
    fn from(map: Record) -> Self {
        Key::Composite(map)
    }
}

/// One table's CRUD surface. Configured once at setup; immutable during
/// request processing.
pub struct CrudService {
    connector: Arc<dyn StorageConnector>,
    schema: Arc<dyn SchemaProvider>,
    table: String,
    registry: FieldRegistry,
    identifier: Option<Vec<String>>,
    joins: Vec<String>,
    validator: Option<Validator>,
    transformer: Option<Transform>,
    reverse_transformer: Option<Transform>,
    after_insert: Option<RecordHook>,
    after_update: Option<RecordHook>,
    after_delete: Option<RecordHook>,
}

impl CrudService {
    pub fn new(
        connector: Arc<dyn StorageConnector>,
        schema: Arc<dyn SchemaProvider>,
        table: impl Into<String>,
    ) -> Self {
        CrudService {
            connector,
            schema,
            table: table.into(),
            registry: FieldRegistry::All,
            identifier: None,
            joins: Vec::new(),
            validator: None,
            transformer: None,
            reverse_transformer: None,
            after_insert: None,
            after_update: None,
            after_delete: None,
        }
    }

    pub fn with_registry(mut self, registry: FieldRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Override the schema provider's primary key.
    pub fn with_identifier(mut self, columns: Vec<String>) -> Self {
        self.identifier = Some(columns);
        self
    }

    /// Append an owner-supplied join clause (e.g. `LEFT JOIN ... ON ...`)
    /// after FROM. Never built from request input.
    pub fn with_join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    pub fn with_validator(
        mut self,
        f: impl Fn(&Record, Option<&Key>) -> Result<(), CrudError> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Box::new(f));
        self
    }

    /// Outbound transform, applied after coercion on every returned record.
    pub fn with_transformer(mut self, f: impl Fn(Record) -> Record + Send + Sync + 'static) -> Self {
        self.transformer = Some(Box::new(f));
        self
    }

    /// Inbound transform, applied to the raw payload before coercion.
    pub fn with_reverse_transformer(
        mut self,
        f: impl Fn(Record) -> Record + Send + Sync + 'static,
    ) -> Self {
        self.reverse_transformer = Some(Box::new(f));
        self
    }

    pub fn on_after_insert(mut self, f: impl Fn(&Record) + Send + Sync + 'static) -> Self {
        self.after_insert = Some(Box::new(f));
        self
    }

    pub fn on_after_update(mut self, f: impl Fn(&Record) + Send + Sync + 'static) -> Self {
        self.after_update = Some(Box::new(f));
        self
    }

    /// Registering this hook makes delete read the row first; the hook
    /// receives the pre-delete snapshot.
    pub fn on_after_delete(mut self, f: impl Fn(&Record) + Send + Sync + 'static) -> Self {
        self.after_delete = Some(Box::new(f));
        self
    }

    /// List rows matching the filter specification, coerced outbound and
    /// passed through the transformer.
    pub async fn list(&self, query: &Record) -> Result<Vec<Record>, CrudError> {
        let resolved = self.resolved().await?;
        let identifier = self.identifier().await?;
        let filter = sql::compile_filter(query, &resolved, &identifier);
        let q = sql::select_sql(&self.table, &self.joins, &resolved, &filter);
        let rows = self.connector.fetch_all(&q.sql, &q.params).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.transformed(coerce::outbound_record(&resolved, row)?));
        }
        Ok(out)
    }

    /// Count rows matching the filter specification.
    pub async fn count(&self, query: &Record) -> Result<i64, CrudError> {
        let resolved = self.resolved().await?;
        let identifier = self.identifier().await?;
        let filter = sql::compile_filter(query, &resolved, &identifier);
        let q = sql::count_sql(&self.table, &self.joins, &filter);
        let scalar = self.connector.fetch_scalar(&q.sql, &q.params).await?;
        Ok(scalar_to_i64(&scalar))
    }

    /// Fetch one row by identifier. Zero rows is [`CrudError::NotFound`].
    pub async fn get_one(&self, key: &Key) -> Result<Record, CrudError> {
        let resolved = self.resolved().await?;
        let identifier = self.identifier().await?;
        let pairs = key_pairs(key, &identifier, &resolved)?;
        let q = sql::select_by_key_sql(&self.table, &self.joins, &resolved, &pairs);
        let mut rows = self.connector.fetch_all(&q.sql, &q.params).await?;
        if rows.is_empty() {
            return Err(CrudError::NotFound);
        }
        let row = rows.remove(0);
        Ok(self.transformed(coerce::outbound_record(&resolved, row)?))
    }

    /// Create one row and return it freshly read back by last-insert-id.
    pub async fn create(&self, payload: Record) -> Result<Record, CrudError> {
        let resolved = self.resolved().await?;
        let record = coerce::inbound_record(&resolved, self.reverse_transformed(payload))?;
        check_writable(&resolved, &record, WriteOp::Create)?;
        if let Some(validate) = &self.validator {
            validate(&record, None)?;
        }
        let storage = to_storage_record(&resolved, &record);
        let affected = self.connector.insert(&self.table, &storage).await?;
        if affected == 0 {
            return Err(CrudError::Storage("insert affected no rows".into()));
        }
        let id = self.connector.last_insert_id().await?;
        let created = self.get_one(&Key::Scalar(id)).await?;
        if let Some(hook) = &self.after_insert {
            hook(&created);
        }
        Ok(created)
    }

    /// Update one row by identifier and return it freshly read back.
    pub async fn update(&self, key: &Key, payload: Record) -> Result<Record, CrudError> {
        let resolved = self.resolved().await?;
        let identifier = self.identifier().await?;
        let record = coerce::inbound_record(&resolved, self.reverse_transformed(payload))?;
        check_writable(&resolved, &record, WriteOp::Update)?;
        if let Some(validate) = &self.validator {
            validate(&record, Some(key))?;
        }
        let storage = to_storage_record(&resolved, &record);
        let where_map: Record = key_pairs(key, &identifier, &resolved)?.into_iter().collect();
        self.connector.update(&self.table, &storage, &where_map).await?;
        let updated = self.get_one(key).await?;
        if let Some(hook) = &self.after_update {
            hook(&updated);
        }
        Ok(updated)
    }

    /// Delete one row by identifier. When an after-delete hook is
    /// registered the current record is read first (the hook needs it);
    /// failing that read aborts the delete.
    pub async fn delete(&self, key: &Key) -> Result<bool, CrudError> {
        let resolved = self.resolved().await?;
        let identifier = self.identifier().await?;
        let snapshot = match &self.after_delete {
            Some(_) => Some(self.get_one(key).await?),
            None => None,
        };
        let where_map: Record = key_pairs(key, &identifier, &resolved)?.into_iter().collect();
        let affected = self.connector.delete(&self.table, &where_map).await?;
        if let (Some(hook), Some(record)) = (&self.after_delete, &snapshot) {
            hook(record);
        }
        Ok(affected > 0)
    }

    async fn resolved(&self) -> Result<ResolvedFields, CrudError> {
        let columns = self.schema.columns_of(&self.table).await?;
        ResolvedFields::resolve(&self.registry, &columns)
    }

    async fn identifier(&self) -> Result<Vec<String>, CrudError> {
        if let Some(id) = &self.identifier {
            if !id.is_empty() {
                return Ok(id.clone());
            }
        }
        let id = self.schema.identifier_of(&self.table).await?;
        if id.is_empty() {
            return Err(CrudError::SchemaMismatch(format!(
                "table '{}' has no identifier",
                self.table
            )));
        }
        Ok(id)
    }

    fn transformed(&self, record: Record) -> Record {
        match &self.transformer {
            Some(f) => f(record),
            None => record,
        }
    }

    fn reverse_transformed(&self, record: Record) -> Record {
        match &self.reverse_transformer {
            Some(f) => f(record),
            None => record,
        }
    }
}

/// Resolve a key into (storage column, value) pairs against the identifier.
fn key_pairs(
    key: &Key,
    identifier: &[String],
    resolved: &ResolvedFields,
) -> Result<Vec<(String, Value)>, CrudError> {
    match key {
        Key::Scalar(v) => {
            if identifier.len() != 1 {
                return Err(CrudError::Validation(
                    "scalar id requires a single-column identifier; pass a key map".into(),
                ));
            }
            Ok(vec![(identifier[0].clone(), v.clone())])
        }
        Key::Composite(map) => Ok(map
            .iter()
            .map(|(alias, v)| {
                let col = resolved.storage_name(alias).unwrap_or(alias);
                (col.to_string(), v.clone())
            })
            .collect()),
    }
}

/// Map record keys from external aliases to storage column names.
fn to_storage_record(resolved: &ResolvedFields, record: &Record) -> Record {
    record
        .iter()
        .map(|(alias, v)| {
            let col = resolved.storage_name(alias).unwrap_or(alias);
            (col.to_string(), v.clone())
        })
        .collect()
}

fn scalar_to_i64(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
