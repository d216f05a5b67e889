//! MySQL connector and schema provider over sqlx.

use crate::connector::{ColumnMeta, SchemaProvider, StorageConnector};
use crate::error::CrudError;
use crate::sql::{quoted, BindValue};
use crate::Record;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlRow};
use sqlx::{Column, Row};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

pub struct MySqlConnector {
    pool: MySqlPool,
    last_insert: AtomicU64,
}

impl MySqlConnector {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlConnector {
            pool,
            last_insert: AtomicU64::new(0),
        }
    }

    pub async fn connect(url: &str) -> Result<Self, CrudError> {
        Ok(Self::new(MySqlPool::connect(url).await?))
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn bind_all<'q>(
    sql: &'q str,
    binds: &[Value],
) -> sqlx::query::Query<'q, sqlx::MySql, MySqlArguments> {
    let mut query = sqlx::query(sql);
    for b in binds {
        query = query.bind(BindValue::from_json(b));
    }
    query
}

#[async_trait]
impl StorageConnector for MySqlConnector {
    async fn execute(&self, sql: &str, binds: &[Value]) -> Result<u64, CrudError> {
        tracing::debug!(sql = %sql, params = ?binds, "execute");
        let res = bind_all(sql, binds).execute(&self.pool).await?;
        if res.last_insert_id() > 0 {
            self.last_insert.store(res.last_insert_id(), Ordering::SeqCst);
        }
        Ok(res.rows_affected())
    }

    async fn fetch_all(&self, sql: &str, binds: &[Value]) -> Result<Vec<Record>, CrudError> {
        tracing::debug!(sql = %sql, params = ?binds, "fetch_all");
        let rows = bind_all(sql, binds).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn fetch_scalar(&self, sql: &str, binds: &[Value]) -> Result<Value, CrudError> {
        tracing::debug!(sql = %sql, params = ?binds, "fetch_scalar");
        let row = bind_all(sql, binds).fetch_optional(&self.pool).await?;
        Ok(row
            .and_then(|r| r.columns().first().map(|c| cell_value(&r, c.name())))
            .unwrap_or(Value::Null))
    }

    async fn last_insert_id(&self) -> Result<Value, CrudError> {
        Ok(Value::Number(self.last_insert.load(Ordering::SeqCst).into()))
    }

    async fn insert(&self, table: &str, record: &Record) -> Result<u64, CrudError> {
        let cols: Vec<String> = record.keys().map(|k| quoted(k)).collect();
        let placeholders = vec!["?"; record.len()].join(",");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted(table),
            cols.join(","),
            placeholders
        );
        let binds: Vec<Value> = record.values().cloned().collect();
        self.execute(&sql, &binds).await
    }

    async fn update(
        &self,
        table: &str,
        record: &Record,
        where_map: &Record,
    ) -> Result<u64, CrudError> {
        if record.is_empty() {
            return Ok(0);
        }
        let sets: Vec<String> = record.keys().map(|k| format!("{}=?", quoted(k))).collect();
        let preds: Vec<String> = where_map.keys().map(|k| format!("{}=?", quoted(k))).collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            quoted(table),
            sets.join(","),
            preds.join(" AND ")
        );
        let binds: Vec<Value> = record.values().chain(where_map.values()).cloned().collect();
        self.execute(&sql, &binds).await
    }

    async fn delete(&self, table: &str, where_map: &Record) -> Result<u64, CrudError> {
        let preds: Vec<String> = where_map.keys().map(|k| format!("{}=?", quoted(k))).collect();
        let sql = format!("DELETE FROM {} WHERE {}", quoted(table), preds.join(" AND "));
        let binds: Vec<Value> = where_map.values().cloned().collect();
        self.execute(&sql, &binds).await
    }
}

fn row_to_record(row: &MySqlRow) -> Record {
    let mut record = Record::new();
    for col in row.columns() {
        let name = col.name();
        record.insert(name.to_string(), cell_value(row, name));
    }
    record
}

fn cell_value(row: &MySqlRow, name: &str) -> Value {
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<u64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%d %H:%M:%S").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(t)) = row.try_get::<Option<chrono::NaiveTime>, _>(name) {
        return Value::String(t.format("%H:%M:%S").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(b)) = row.try_get::<Option<Vec<u8>>, _>(name) {
        return Value::String(String::from_utf8_lossy(&b).into_owned());
    }
    Value::Null
}

/// Column metadata from information_schema, cached per table name for
/// process lifetime. Redundant population under concurrent first access is
/// harmless; entries are idempotent and never invalidated.
pub struct MySqlSchemaProvider {
    pool: MySqlPool,
    cache: RwLock<HashMap<String, Arc<Vec<ColumnMeta>>>>,
}

impl MySqlSchemaProvider {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlSchemaProvider {
            pool,
            cache: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SchemaProvider for MySqlSchemaProvider {
    async fn columns_of(&self, table: &str) -> Result<Vec<ColumnMeta>, CrudError> {
        if let Some(cols) = self.cache.read().ok().and_then(|c| c.get(table).cloned()) {
            return Ok((*cols).clone());
        }
        let sql = "SELECT column_name, column_type, is_nullable, column_default, column_key \
                   FROM information_schema.columns \
                   WHERE table_schema = DATABASE() AND table_name = ? \
                   ORDER BY ordinal_position";
        tracing::debug!(table = %table, "load columns");
        let rows = sqlx::query(sql).bind(table).fetch_all(&self.pool).await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get(0)?;
            let native_type: String = row.try_get(1)?;
            let nullable: String = row.try_get(2)?;
            let default_value: Option<String> = row.try_get(3)?;
            let key: String = row.try_get(4)?;
            columns.push(ColumnMeta {
                name,
                native_type,
                nullable: nullable.eq_ignore_ascii_case("yes"),
                default_value,
                primary_key: key == "PRI",
            });
        }
        let columns = Arc::new(columns);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(table.to_string(), columns.clone());
        }
        Ok((*columns).clone())
    }
}
