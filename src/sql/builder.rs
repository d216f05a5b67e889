//! Filter-query compiler: turns a filter specification (`alias` or
//! `alias__operator` keys plus ordering/paging directives) into a WHERE
//! predicate, a positional bind list, and ORDER BY/LIMIT/OFFSET, then
//! assembles the SELECT statements built on top of it.

use crate::coerce::parse_i64_prefix;
use crate::registry::{FieldType, ResolvedFields};
use crate::Record;
use serde_json::Value;

/// Query keys that configure ordering/paging, not filtering.
const RESERVED_KEYS: &[&str] = &["order_by", "order", "limit", "offset"];

pub const DEFAULT_LIMIT: i64 = 1000;

/// A SQL string plus its positional bind values.
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Compiled filter specification. `where_sql` always starts from the
/// always-true base predicate, so an empty specification matches every row.
pub struct CompiledFilter {
    pub where_sql: String,
    pub binds: Vec<Value>,
    pub order_by: String,
    pub order: &'static str,
    pub limit: i64,
    pub offset: i64,
}

/// Quote a storage identifier. Qualified names (`t.col`) quote each part.
pub fn quoted(name: &str) -> String {
    name.split('.')
        .map(|part| format!("`{}`", part.replace('`', "``")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Compile a filter specification against the resolved fields. Filter keys
/// that resolve to no field contribute no predicate; only registry/schema
/// identifiers ever reach the SQL text, values are always bound.
pub fn compile_filter(
    query: &Record,
    resolved: &ResolvedFields,
    identifier: &[String],
) -> CompiledFilter {
    let mut where_sql = String::from("1");
    let mut binds = Vec::new();

    for (key, val) in query {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let (alias, op) = match key.split_once("__") {
            Some((a, o)) => (a, Some(o)),
            None => (key.as_str(), None),
        };
        let Some(field) = resolved.field(alias) else {
            continue;
        };
        let col = quoted(&field.storage_name);
        match op {
            None => {
                where_sql.push_str(&format!(" AND {}=?", col));
                binds.push(normalize_eq(field.field_type, val));
            }
            Some("contains") => {
                // Repeatable: an array of values yields one AND'd LIKE each.
                match val {
                    Value::Array(items) => {
                        for item in items {
                            push_like(&mut where_sql, &mut binds, &col, format!("%{}%", scalar_text(item)));
                        }
                    }
                    single => push_like(&mut where_sql, &mut binds, &col, format!("%{}%", scalar_text(single))),
                }
            }
            Some("startswith") => {
                push_like(&mut where_sql, &mut binds, &col, format!("{}%", scalar_text(val)));
            }
            Some("endswith") => {
                push_like(&mut where_sql, &mut binds, &col, format!("%{}", scalar_text(val)));
            }
            Some(cmp @ ("lt" | "lte" | "gt" | "gte")) => {
                let sym = match cmp {
                    "lt" => "<",
                    "lte" => "<=",
                    "gt" => ">",
                    _ => ">=",
                };
                where_sql.push_str(&format!(" AND {col} IS NOT NULL AND {col} {sym} ?"));
                binds.push(val.clone());
            }
            Some("in") => {
                let items = csv_list(val);
                if items.is_empty() {
                    where_sql.push_str(" AND 0");
                } else {
                    where_sql.push_str(&format!(
                        " AND {col} IS NOT NULL AND {col} IN ({})",
                        placeholders(items.len())
                    ));
                    binds.extend(items);
                }
            }
            Some("not_in") => {
                // Null rows count as "not in".
                let items = csv_list(val);
                if !items.is_empty() {
                    where_sql.push_str(&format!(
                        " AND ({col} IS NULL OR {col} NOT IN ({}))",
                        placeholders(items.len())
                    ));
                    binds.extend(items);
                }
            }
            Some("isnull") => {
                if is_true_literal(val) {
                    where_sql.push_str(&format!(" AND {col} IS NULL"));
                } else {
                    where_sql.push_str(&format!(" AND {col} IS NOT NULL"));
                }
            }
            Some(_) => {}
        }
    }

    let order_by = order_column(query, resolved, identifier);
    let order = match query.get("order").map(scalar_text) {
        Some(o) if o.eq_ignore_ascii_case("desc") => "DESC",
        _ => "ASC",
    };
    let limit = query
        .get("limit")
        .map(int_from_value)
        .unwrap_or(DEFAULT_LIMIT);
    let offset = query.get("offset").map(int_from_value).unwrap_or(0);

    CompiledFilter {
        where_sql,
        binds,
        order_by,
        order,
        limit,
        offset,
    }
}

/// SELECT with the readable column list, filter, ordering and paging.
pub fn select_sql(
    table: &str,
    joins: &[String],
    resolved: &ResolvedFields,
    filter: &CompiledFilter,
) -> QueryBuf {
    QueryBuf {
        sql: format!(
            "SELECT {} FROM {}{} WHERE {} ORDER BY {} {} LIMIT {} OFFSET {}",
            select_column_list(resolved),
            quoted(table),
            join_clause(joins),
            filter.where_sql,
            filter.order_by,
            filter.order,
            filter.limit,
            filter.offset
        ),
        params: filter.binds.clone(),
    }
}

/// SELECT COUNT(*) with the same predicate, no ordering or paging.
pub fn count_sql(table: &str, joins: &[String], filter: &CompiledFilter) -> QueryBuf {
    QueryBuf {
        sql: format!(
            "SELECT COUNT(*) FROM {}{} WHERE {}",
            quoted(table),
            join_clause(joins),
            filter.where_sql
        ),
        params: filter.binds.clone(),
    }
}

/// SELECT by identifier predicate; `pairs` hold storage column names.
pub fn select_by_key_sql(
    table: &str,
    joins: &[String],
    resolved: &ResolvedFields,
    pairs: &[(String, Value)],
) -> QueryBuf {
    let mut where_sql = String::from("1");
    let mut params = Vec::with_capacity(pairs.len());
    for (col, val) in pairs {
        where_sql.push_str(&format!(" AND {}=?", quoted(col)));
        params.push(val.clone());
    }
    QueryBuf {
        sql: format!(
            "SELECT {} FROM {}{} WHERE {}",
            select_column_list(resolved),
            quoted(table),
            join_clause(joins),
            where_sql
        ),
        params,
    }
}

fn select_column_list(resolved: &ResolvedFields) -> String {
    if !resolved.is_explicit() {
        return "*".into();
    }
    let cols: Vec<String> = resolved
        .readable_fields()
        .map(|f| {
            if f.alias == f.storage_name {
                quoted(&f.storage_name)
            } else {
                format!("{} AS {}", quoted(&f.storage_name), quoted(&f.alias))
            }
        })
        .collect();
    if cols.is_empty() {
        "*".into()
    } else {
        cols.join(", ")
    }
}

fn join_clause(joins: &[String]) -> String {
    joins.iter().map(|j| format!(" {}", j)).collect::<String>()
}

fn push_like(where_sql: &mut String, binds: &mut Vec<Value>, col: &str, pattern: String) {
    // Wildcards are concatenated into the bound value, never the SQL text.
    where_sql.push_str(&format!(" AND {col} IS NOT NULL AND {col} LIKE ?"));
    binds.push(Value::String(pattern));
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn normalize_eq(field_type: FieldType, val: &Value) -> Value {
    if field_type == FieldType::Boolean {
        match val {
            Value::String(s) if s == "true" => return Value::Number(1.into()),
            Value::String(s) if s == "false" => return Value::Number(0.into()),
            Value::Bool(b) => return Value::Number(i64::from(*b).into()),
            _ => {}
        }
    }
    val.clone()
}

fn csv_list(val: &Value) -> Vec<Value> {
    match val {
        Value::String(s) => s
            .split(',')
            .map(|part| Value::String(part.to_string()))
            .collect(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn is_true_literal(val: &Value) -> bool {
    matches!(val, Value::Bool(true)) || matches!(val, Value::String(s) if s == "true")
}

/// Column names cannot be parameter-bound; the sort column is restricted to
/// safe characters instead. A known alias resolves to its storage column
/// first. An explicit name stripped down to nothing falls back to the
/// identifier, as does an absent one.
fn order_column(query: &Record, resolved: &ResolvedFields, identifier: &[String]) -> String {
    let fallback = identifier.first().map(String::as_str).unwrap_or("");
    let requested = query
        .get("order_by")
        .map(scalar_text)
        .filter(|s| !s.is_empty());
    let column = match &requested {
        Some(name) => resolved.storage_name(name).unwrap_or(name.as_str()),
        None => fallback,
    };
    let sanitized = sanitize_identifier(column);
    if sanitized.is_empty() {
        sanitize_identifier(fallback)
    } else {
        sanitized
    }
}

fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "true".into(),
        Value::Bool(false) => "false".into(),
        other => other.to_string(),
    }
}

fn int_from_value(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
        Value::String(s) => parse_i64_prefix(s),
        _ => 0,
    }
}
