//! Dynamically typed binding values.
//!
//! Bindings travel as [`Value`]s so that filter maps, schema constants and
//! paging parameters can share one map. `Value` implements [`ToSql`] by
//! encoding the wrapped Rust type as the parameter's declared type; numbers
//! convert between integer, float and `numeric` parameters, anything else
//! must match or fails with a wrong-type error.

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error as StdError;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use uuid::Uuid;

/// A value bound to a `:name` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    IntArray(Vec<i64>),
    TextArray(Vec<String>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::Int(v) => int_to_sql(*v, ty, out),
            Value::Float(v) => float_to_sql(*v, ty, out),
            Value::Text(v) => {
                // Enum labels share the text wire format.
                if matches!(ty.kind(), Kind::Enum(_)) {
                    out.extend_from_slice(v.as_bytes());
                    Ok(IsNull::No)
                } else {
                    v.to_sql_checked(ty, out)
                }
            }
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) => v.to_sql_checked(ty, out),
            Value::IntArray(v) => int_array_to_sql(v, ty, out),
            Value::TextArray(v) => v.to_sql_checked(ty, out),
            Value::Json(v) => v.to_sql_checked(ty, out),
        }
    }

    // Every variant checks the parameter type itself in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

type EncodeResult = Result<IsNull, Box<dyn StdError + Sync + Send>>;

/// Encode an integer as the parameter's declared numeric type.
fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    if *ty == Type::INT2 {
        i16::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::INT4 {
        i32::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::FLOAT4 {
        (v as f32).to_sql(ty, out)
    } else if *ty == Type::FLOAT8 {
        (v as f64).to_sql(ty, out)
    } else if *ty == Type::NUMERIC {
        Decimal::from(v).to_sql(ty, out)
    } else {
        v.to_sql_checked(ty, out)
    }
}

fn float_to_sql(v: f64, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    if *ty == Type::FLOAT4 {
        (v as f32).to_sql(ty, out)
    } else if *ty == Type::NUMERIC {
        Decimal::try_from(v)?.to_sql(ty, out)
    } else {
        v.to_sql_checked(ty, out)
    }
}

fn int_array_to_sql(v: &[i64], ty: &Type, out: &mut BytesMut) -> EncodeResult {
    if *ty == Type::INT2_ARRAY {
        let narrowed = v.iter().map(|i| i16::try_from(*i)).collect::<Result<Vec<_>, _>>()?;
        narrowed.to_sql(ty, out)
    } else if *ty == Type::INT4_ARRAY {
        let narrowed = v.iter().map(|i| i32::try_from(*i)).collect::<Result<Vec<_>, _>>()?;
        narrowed.to_sql(ty, out)
    } else if *ty == Type::NUMERIC_ARRAY {
        v.iter().map(|i| Decimal::from(*i)).collect::<Vec<_>>().to_sql(ty, out)
    } else {
        v.to_sql_checked(ty, out)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Json(Json::Number(n)), Value::Float),
            },
            Json::String(s) => Value::Text(s),
            Json::Array(items) => {
                if !items.is_empty() && items.iter().all(|v| v.is_i64()) {
                    Value::IntArray(items.iter().filter_map(Json::as_i64).collect())
                } else if !items.is_empty() && items.iter().all(Json::is_string) {
                    Value::TextArray(
                        items
                            .into_iter()
                            .filter_map(|v| match v {
                                Json::String(s) => Some(s),
                                _ => None,
                            })
                            .collect(),
                    )
                } else {
                    Value::Json(Json::Array(items))
                }
            }
            obj @ Json::Object(_) => Value::Json(obj),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
    Vec<i64> => IntArray,
    Vec<String> => TextArray,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
