//! Convert serde_json::Value to types that sqlx can bind, for both dialects
//! this engine ships connectors for.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::{Database, MySql, Sqlite};

/// A value that can be bound to a MySQL or SQLite query. Converts from
/// serde_json::Value.
#[derive(Clone, Debug)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
}

impl BindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else {
                    BindValue::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => BindValue::Text(s.clone()),
            other => BindValue::Text(other.to_string()),
        }
    }
}

impl<'q> Encode<'q, MySql> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <MySql as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            BindValue::Null => <Option<i64> as Encode<MySql>>::encode_by_ref(&None, buf)?,
            BindValue::Bool(b) => <bool as Encode<MySql>>::encode_by_ref(b, buf)?,
            BindValue::I64(n) => <i64 as Encode<MySql>>::encode_by_ref(n, buf)?,
            BindValue::F64(n) => <f64 as Encode<MySql>>::encode_by_ref(n, buf)?,
            BindValue::Text(s) => <String as Encode<MySql>>::encode_by_ref(s, buf)?,
        })
    }

    fn produces(&self) -> Option<<MySql as Database>::TypeInfo> {
        Some(match self {
            BindValue::Null | BindValue::I64(_) => <i64 as sqlx::Type<MySql>>::type_info(),
            BindValue::Bool(_) => <bool as sqlx::Type<MySql>>::type_info(),
            BindValue::F64(_) => <f64 as sqlx::Type<MySql>>::type_info(),
            BindValue::Text(_) => <str as sqlx::Type<MySql>>::type_info(),
        })
    }
}

impl sqlx::Type<MySql> for BindValue {
    fn type_info() -> <MySql as Database>::TypeInfo {
        <str as sqlx::Type<MySql>>::type_info()
    }

    fn compatible(_ty: &<MySql as Database>::TypeInfo) -> bool {
        true
    }
}

impl<'q> Encode<'q, Sqlite> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            BindValue::Null => <Option<i64> as Encode<Sqlite>>::encode_by_ref(&None, buf)?,
            BindValue::Bool(b) => <bool as Encode<Sqlite>>::encode_by_ref(b, buf)?,
            BindValue::I64(n) => <i64 as Encode<Sqlite>>::encode_by_ref(n, buf)?,
            BindValue::F64(n) => <f64 as Encode<Sqlite>>::encode_by_ref(n, buf)?,
            BindValue::Text(s) => <String as Encode<Sqlite>>::encode_by_ref(s, buf)?,
        })
    }
}

impl sqlx::Type<Sqlite> for BindValue {
    fn type_info() -> <Sqlite as Database>::TypeInfo {
        <str as sqlx::Type<Sqlite>>::type_info()
    }

    fn compatible(_ty: &<Sqlite as Database>::TypeInfo) -> bool {
        true
    }
}
