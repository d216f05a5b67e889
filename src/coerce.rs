//! Bidirectional type coercion between the external (loosely-typed) and
//! storage representations of a record.
//!
//! Outbound runs immediately after reading from storage, before the caller's
//! transformer. Inbound runs immediately before writing, after the caller's
//! reverse transformer. Both are pure per-field mappings driven by the
//! resolved field type.

use crate::error::CrudError;
use crate::registry::{FieldType, ResolvedFields};
use crate::Record;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+:[0-9]{2}(:[0-9]{2})?$").expect("time pattern"));
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date pattern"));
static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}$").expect("datetime pattern")
});

/// Storage -> external, field by field. Row columns that the registry does
/// not expose for reading are omitted; a column an `All` registry cannot
/// type is a schema mismatch.
pub fn outbound_record(resolved: &ResolvedFields, row: Record) -> Result<Record, CrudError> {
    let mut out = Record::new();
    for (alias, val) in row {
        match resolved.field(&alias) {
            Some(f) if f.readable => {
                out.insert(alias, outbound_value(f.field_type, val));
            }
            Some(_) => {}
            None if resolved.is_explicit() => {}
            None => {
                return Err(CrudError::SchemaMismatch(format!(
                    "field '{}' has no field type",
                    alias
                )));
            }
        }
    }
    Ok(out)
}

/// External -> storage, field by field. A payload key the registry does not
/// know is a schema mismatch. Fields whose value fails the type's format
/// check are dropped from the outgoing record (deliberate policy: malformed
/// non-empty temporal input is neither stored nor rejected).
pub fn inbound_record(resolved: &ResolvedFields, payload: Record) -> Result<Record, CrudError> {
    let mut out = Record::new();
    for (alias, val) in payload {
        let field = resolved.field(&alias).ok_or_else(|| {
            CrudError::SchemaMismatch(format!("field '{}' has no field type", alias))
        })?;
        if let Some(coerced) = inbound_value(field.field_type, val) {
            out.insert(alias, coerced);
        }
    }
    Ok(out)
}

fn outbound_value(field_type: FieldType, val: Value) -> Value {
    match field_type {
        FieldType::Integer => match val {
            Value::Null => Value::Null,
            other => Value::Number(int_lossy(&other).into()),
        },
        FieldType::Float => match val {
            Value::Null => Value::Null,
            other => serde_json::Number::from_f64(float_lossy(&other))
                .map(Value::Number)
                .unwrap_or(Value::Null),
        },
        FieldType::Boolean => match val {
            Value::Null => Value::Null,
            other => Value::Bool(truthy(&other)),
        },
        // Temporal and textual values are already canonical strings.
        _ => val,
    }
}

/// Returns `None` when the field must be dropped from the outgoing record.
fn inbound_value(field_type: FieldType, val: Value) -> Option<Value> {
    match field_type {
        FieldType::Time => inbound_temporal(&TIME_RE, val),
        FieldType::Date => inbound_temporal(&DATE_RE, val),
        FieldType::Datetime => inbound_temporal(&DATETIME_RE, val),
        FieldType::Text => Some(match val {
            Value::Null => Value::Null,
            other => Value::String(filter_text(&value_display(&other))),
        }),
        FieldType::Integer => Some(match val {
            Value::Null | Value::Bool(false) => Value::Null,
            Value::String(s) if s.is_empty() => Value::Null,
            other => Value::Number(int_lossy(&other).into()),
        }),
        FieldType::Float => Some(match val {
            Value::Null | Value::Bool(false) => Value::Null,
            Value::String(s) if s.is_empty() => Value::Null,
            other => serde_json::Number::from_f64(float_lossy(&other))
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }),
        FieldType::Boolean => Some(match val {
            Value::Bool(false) => Value::Number(0.into()),
            Value::Bool(true) => Value::Number(1.into()),
            Value::String(s) if s == "false" => Value::Number(0.into()),
            Value::String(s) if s == "true" => Value::Number(1.into()),
            // Non-canonical spellings ("0", "1", "yes") pass through as-is.
            other => other,
        }),
        // String, Blob and untyped fields share the single-line filter.
        _ => Some(match val {
            Value::Null => Value::Null,
            other => Value::String(filter_string(&value_display(&other))),
        }),
    }
}

fn inbound_temporal(pattern: &Regex, val: Value) -> Option<Value> {
    match val {
        Value::String(s) if pattern.is_match(&s) => Some(Value::String(s)),
        Value::String(s) if s.is_empty() => Some(Value::Null),
        Value::Null => Some(Value::Null),
        _ => None,
    }
}

/// Replace non-printable control codes (U+0000..=U+0008, U+000B..=U+0013)
/// with a space. Line feed and carriage return survive; `text` fields may
/// span lines.
pub fn filter_text(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\u{0000}'..='\u{0008}' | '\u{000B}'..='\u{0013}' => ' ',
            _ => c,
        })
        .collect()
}

/// Like [`filter_text`], but also replaces line feed and carriage return;
/// values destined for single-line storage must not contain embedded newlines.
pub fn filter_string(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\u{0000}'..='\u{0008}' | '\u{000B}'..='\u{0013}' | '\n' | '\r' => ' ',
            _ => c,
        })
        .collect()
}

fn value_display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "true".into(),
        Value::Bool(false) => "false".into(),
        other => other.to_string(),
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Null => false,
        _ => true,
    }
}

fn int_lossy(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
        Value::String(s) => parse_i64_prefix(s),
        Value::Bool(true) => 1,
        _ => 0,
    }
}

fn float_lossy(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_f64_prefix(s),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

/// Parse the longest leading integer prefix; non-numeric input parses to 0.
pub(crate) fn parse_i64_prefix(s: &str) -> i64 {
    let t = s.trim();
    let mut end = 0;
    for (i, c) in t.char_indices() {
        if c.is_ascii_digit() || (i == 0 && (c == '+' || c == '-')) {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    t[..end].parse().unwrap_or(0)
}

/// Parse the longest leading float prefix; non-numeric input parses to 0.
fn parse_f64_prefix(s: &str) -> f64 {
    let t = s.trim();
    let mut end = t.len();
    while end > 0 {
        if let Ok(f) = t[..end].parse::<f64>() {
            if f.is_finite() {
                return f;
            }
        }
        end -= 1;
        while end > 0 && !t.is_char_boundary(end) {
            end -= 1;
        }
    }
    0.0
}
