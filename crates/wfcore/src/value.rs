use crate::StepError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The mutable key/value bag threaded through every step of a run.
///
/// Keys are open-ended; handlers own the schema and must treat missing or
/// wrongly typed entries as their own error.
pub type Data = HashMap<String, Value>;

/// One entry of the data bag.
///
/// Serialized adjacently tagged (`{"type": "Number", "value": 1.5}`) so a
/// checkpoint keeps the variant. Non-finite numbers are written as the
/// strings `"NaN"`, `"inf"` and `"-inf"`, which JSON numbers cannot express.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Number(#[serde(with = "number")] f64),
    String(String),
    Bytes(Vec<u8>),
    /// Structured payload a handler keeps as-is
    Json(serde_json::Value),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        if let Value::Number(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        if let Value::Array(items) = self {
            Some(items)
        } else {
            None
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        if let Value::Json(j) = self {
            Some(j)
        } else {
            None
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

value_from! {
    String => |s| Value::String(s),
    &str => |s| Value::String(s.to_owned()),
    f64 => |n| Value::Number(n),
    i64 => |n| Value::Number(n as f64),
    i32 => |n| Value::Number(f64::from(n)),
    bool => |b| Value::Bool(b),
    Vec<Value> => |items| Value::Array(items),
    serde_json::Value => |j| Value::Json(j),
}

mod number {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if n.is_finite() {
            serializer.serialize_f64(*n)
        } else if n.is_nan() {
            serializer.serialize_str("NaN")
        } else if n.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Special(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Finite(n) => Ok(n),
            Repr::Special(s) => match s.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid number {other:?}"))),
            },
        }
    }
}

/// Get a required entry from the data bag or return a handler error
pub fn require<'a>(data: &'a Data, key: &str) -> Result<&'a Value, StepError> {
    data.get(key)
        .ok_or_else(|| StepError::MissingInput(key.to_string()))
}

pub fn require_str<'a>(data: &'a Data, key: &str) -> Result<&'a str, StepError> {
    let value = require(data, key)?;
    value.as_str().ok_or_else(|| mismatch(key, "string", value))
}

pub fn require_bool(data: &Data, key: &str) -> Result<bool, StepError> {
    let value = require(data, key)?;
    value.as_bool().ok_or_else(|| mismatch(key, "bool", value))
}

pub fn require_f64(data: &Data, key: &str) -> Result<f64, StepError> {
    let value = require(data, key)?;
    value.as_f64().ok_or_else(|| mismatch(key, "number", value))
}

fn mismatch(key: &str, expected: &str, actual: &Value) -> StepError {
    StepError::InvalidInputType {
        field: key.to_string(),
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}
