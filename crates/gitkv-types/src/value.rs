use serde::{Deserialize, Serialize};

use crate::tag::TypeTag;

/// Binary payload with an attached MIME type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryObject {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl BinaryObject {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// A key or value stored in gitkv.
///
/// Every variant has a reversible byte encoding (see [`crate::codec`]).
/// `Json` is intended for null, arrays and objects. JSON scalars have native
/// variants, and [`TypedValue::from_json`] picks them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    Number(f64),
    Boolean(bool),
    String(String),
    Json(serde_json::Value),
    Blob(BinaryObject),
    Bytes(Vec<u8>),
}

impl TypedValue {
    /// The tag this value is stored under.
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Number(_) => TypeTag::Number,
            Self::Boolean(_) => TypeTag::Boolean,
            Self::String(_) => TypeTag::String,
            Self::Json(_) => TypeTag::Json,
            Self::Blob(_) => TypeTag::Blob,
            Self::Bytes(_) => TypeTag::Bytes,
        }
    }

    /// Convert a JSON document, mapping scalars to their native variants.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Bool(b) => Self::Boolean(b),
            Value::String(s) => Self::String(s),
            Value::Number(n) => match n.as_f64() {
                Some(x) => Self::Number(x),
                None => Self::Json(Value::Number(n)),
            },
            other => Self::Json(other),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for TypedValue {
    fn from(x: f64) -> Self {
        Self::Number(x)
    }
}

impl From<i32> for TypedValue {
    fn from(x: i32) -> Self {
        Self::Number(f64::from(x))
    }
}

impl From<bool> for TypedValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<u8>> for TypedValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<BinaryObject> for TypedValue {
    fn from(blob: BinaryObject) -> Self {
        Self::Blob(blob)
    }
}

impl From<serde_json::Value> for TypedValue {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_follow_variants() {
        assert_eq!(TypedValue::from(1.5).tag(), TypeTag::Number);
        assert_eq!(TypedValue::from(true).tag(), TypeTag::Boolean);
        assert_eq!(TypedValue::from("x").tag(), TypeTag::String);
        assert_eq!(TypedValue::Json(json!([1, 2])).tag(), TypeTag::Json);
        assert_eq!(
            TypedValue::from(BinaryObject::new("image/png", vec![1])).tag(),
            TypeTag::Blob
        );
        assert_eq!(TypedValue::from(vec![1u8, 2]).tag(), TypeTag::Bytes);
    }

    #[test]
    fn from_json_maps_scalars() {
        assert_eq!(TypedValue::from_json(json!(3)), TypedValue::Number(3.0));
        assert_eq!(TypedValue::from_json(json!(false)), TypedValue::Boolean(false));
        assert_eq!(TypedValue::from_json(json!("s")), TypedValue::String("s".into()));
        assert_eq!(TypedValue::from_json(json!(null)), TypedValue::Json(json!(null)));
        assert_eq!(
            TypedValue::from_json(json!({"a": 1})),
            TypedValue::Json(json!({"a": 1}))
        );
    }

    #[test]
    fn accessors() {
        assert_eq!(TypedValue::from(2).as_number(), Some(2.0));
        assert_eq!(TypedValue::from(true).as_bool(), Some(true));
        assert_eq!(TypedValue::from("hi").as_str(), Some("hi"));
        assert_eq!(TypedValue::from("hi").as_number(), None);
    }
}
