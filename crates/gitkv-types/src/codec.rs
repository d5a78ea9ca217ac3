//! Byte encoding of typed values.
//!
//! Every [`TypedValue`] serializes to a [`SerializedValue`]: a tag, the bytes
//! written to the remote, and for blobs the MIME type that travels as the
//! commit message.
//!
//! Numbers use two encodings. If the shortest decimal text (in the
//! ECMAScript `Number.prototype.toString` format) is at most
//! [`NUMBER_TEXT_LIMIT`] characters it is stored as that text, otherwise as
//! the 8-byte little-endian IEEE-754 double. Decoding branches on length:
//! exactly 8 bytes is a double, anything else is text. Stored data depends on
//! this rule, so the limit must not change.

use crate::error::{TypeError, TypeResult};
use crate::tag::TypeTag;
use crate::value::{BinaryObject, TypedValue};

/// Longest decimal text stored for a number before switching to binary.
pub const NUMBER_TEXT_LIMIT: usize = 7;

/// The wire form of a [`TypedValue`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializedValue {
    pub tag: TypeTag,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SerializedValue {
    /// Decode back into a value.
    pub fn deserialize(&self) -> TypeResult<TypedValue> {
        TypedValue::deserialize(self.tag, self.mime_type.as_deref(), &self.bytes)
    }
}

impl TypedValue {
    /// Encode this value for storage.
    pub fn serialize(&self) -> TypeResult<SerializedValue> {
        let (mime_type, bytes) = match self {
            Self::Number(x) => (None, encode_number(*x)),
            Self::Boolean(b) => (None, b.to_string().into_bytes()),
            Self::String(s) => (None, s.as_bytes().to_vec()),
            Self::Json(value) => (
                None,
                serde_json::to_vec(value).map_err(|e| TypeError::Serialization(e.to_string()))?,
            ),
            Self::Blob(blob) => (Some(blob.mime_type.clone()), blob.data.clone()),
            Self::Bytes(bytes) => (None, bytes.clone()),
        };
        Ok(SerializedValue {
            tag: self.tag(),
            mime_type,
            bytes,
        })
    }

    /// Decode stored bytes under `tag`.
    ///
    /// `mime_type` is only consulted for [`TypeTag::Blob`]; a missing one
    /// decodes as the empty string.
    pub fn deserialize(tag: TypeTag, mime_type: Option<&str>, bytes: &[u8]) -> TypeResult<Self> {
        match tag {
            TypeTag::Number => decode_number(bytes).map(Self::Number),
            TypeTag::Boolean => Ok(Self::Boolean(utf8(tag, bytes)? == "true")),
            TypeTag::String => Ok(Self::String(utf8(tag, bytes)?.to_string())),
            TypeTag::Json => serde_json::from_slice(bytes)
                .map(Self::Json)
                .map_err(|e| decode_error(tag, e)),
            TypeTag::Blob => Ok(Self::Blob(BinaryObject::new(
                mime_type.unwrap_or_default(),
                bytes.to_vec(),
            ))),
            TypeTag::Bytes => Ok(Self::Bytes(bytes.to_vec())),
        }
    }

    /// Decode stored bytes under a tag given by name.
    pub fn deserialize_named(tag: &str, mime_type: Option<&str>, bytes: &[u8]) -> TypeResult<Self> {
        Self::deserialize(tag.parse()?, mime_type, bytes)
    }
}

fn encode_number(x: f64) -> Vec<u8> {
    let text = ecmascript_number_text(x);
    if text.len() <= NUMBER_TEXT_LIMIT {
        text.into_bytes()
    } else {
        x.to_le_bytes().to_vec()
    }
}

fn decode_number(bytes: &[u8]) -> TypeResult<f64> {
    if let Ok(raw) = <[u8; 8]>::try_from(bytes) {
        return Ok(f64::from_le_bytes(raw));
    }
    let text = utf8(TypeTag::Number, bytes)?;
    text.trim()
        .parse::<f64>()
        .map_err(|e| decode_error(TypeTag::Number, e))
}

fn utf8(tag: TypeTag, bytes: &[u8]) -> TypeResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| decode_error(tag, e))
}

fn decode_error(tag: TypeTag, reason: impl std::fmt::Display) -> TypeError {
    TypeError::Decode {
        tag: tag.name().to_string(),
        reason: reason.to_string(),
    }
}

/// Shortest round-trip decimal text of `x` in ECMAScript number format.
///
/// Plain notation is used for decimal exponents in `-7..21`, exponent
/// notation (`1e+21`, `1.5e-7`) outside that range. Negative zero prints
/// as `0`.
pub fn ecmascript_number_text(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x == 0.0 {
        return "0".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let sign = if x < 0.0 { "-" } else { "" };
    // `{:e}` prints the shortest digits that round-trip, e.g. `1.2345e3`.
    let scientific = format!("{:e}", x.abs());
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let e = n - 1;
        let e_sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{e_sign}{}", e.abs())
        } else {
            format!("{first}.{rest}e{e_sign}{}", e.abs())
        }
    };
    format!("{sign}{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn roundtrip(value: TypedValue) -> TypedValue {
        value.serialize().unwrap().deserialize().unwrap()
    }

    #[test]
    fn ecmascript_text_matches_reference_outputs() {
        assert_eq!(ecmascript_number_text(42.0), "42");
        assert_eq!(ecmascript_number_text(-1.5), "-1.5");
        assert_eq!(ecmascript_number_text(0.1), "0.1");
        assert_eq!(ecmascript_number_text(3.14), "3.14");
        assert_eq!(ecmascript_number_text(-0.0), "0");
        assert_eq!(ecmascript_number_text(1e21), "1e+21");
        assert_eq!(ecmascript_number_text(1.5e21), "1.5e+21");
        assert_eq!(ecmascript_number_text(1e20), "100000000000000000000");
        assert_eq!(ecmascript_number_text(0.000001), "0.000001");
        assert_eq!(ecmascript_number_text(1e-7), "1e-7");
        assert_eq!(ecmascript_number_text(1.25e-7), "1.25e-7");
        assert_eq!(ecmascript_number_text(123456789.0), "123456789");
        assert_eq!(ecmascript_number_text(f64::NAN), "NaN");
        assert_eq!(ecmascript_number_text(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn short_numbers_are_text() {
        let encoded = TypedValue::Number(1234567.0).serialize().unwrap();
        assert_eq!(encoded.bytes, b"1234567");
        assert_eq!(encoded.tag, TypeTag::Number);
        let encoded = TypedValue::Number(1e-7).serialize().unwrap();
        assert_eq!(encoded.bytes, b"1e-7");
    }

    #[test]
    fn long_numbers_are_binary() {
        let pi = std::f64::consts::PI;
        let encoded = TypedValue::Number(pi).serialize().unwrap();
        assert_eq!(encoded.bytes, pi.to_le_bytes());
        assert_eq!(encoded.deserialize().unwrap(), TypedValue::Number(pi));

        let encoded = TypedValue::Number(12345678.0).serialize().unwrap();
        assert_eq!(encoded.bytes.len(), 8);
    }

    #[test]
    fn booleans_and_strings_are_text() {
        let encoded = TypedValue::Boolean(true).serialize().unwrap();
        assert_eq!(encoded.bytes, b"true");
        assert_eq!(roundtrip(TypedValue::Boolean(false)), TypedValue::Boolean(false));
        assert_eq!(roundtrip("héllo".into()), TypedValue::String("héllo".into()));
    }

    #[test]
    fn json_is_compact_text() {
        let value = TypedValue::Json(json!({"a": [1, 2, null]}));
        let encoded = value.serialize().unwrap();
        assert_eq!(encoded.tag, TypeTag::Json);
        assert_eq!(encoded.bytes, br#"{"a":[1,2,null]}"#);
        assert_eq!(roundtrip(value.clone()), value);
        assert_eq!(roundtrip(TypedValue::Json(json!(null))), TypedValue::Json(json!(null)));
    }

    #[test]
    fn blob_mime_travels_beside_bytes() {
        let blob = TypedValue::Blob(BinaryObject::new("text/plain", b"hi".to_vec()));
        let encoded = blob.serialize().unwrap();
        assert_eq!(encoded.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(encoded.bytes, b"hi");
        assert_eq!(encoded.deserialize().unwrap(), blob);
    }

    #[test]
    fn blob_without_mime_decodes_empty() {
        let value = TypedValue::deserialize(TypeTag::Blob, None, b"x").unwrap();
        assert_eq!(value, TypedValue::Blob(BinaryObject::new("", b"x".to_vec())));
    }

    #[test]
    fn raw_bytes_are_unchanged() {
        let encoded = TypedValue::Bytes(vec![0, 255, 7]).serialize().unwrap();
        assert_eq!(encoded.tag, TypeTag::Bytes);
        assert_eq!(encoded.bytes, vec![0, 255, 7]);
    }

    #[test]
    fn unknown_tag_name_is_unsupported() {
        let err = TypedValue::deserialize_named("Symbol", None, b"").unwrap_err();
        assert_eq!(err, TypeError::UnsupportedType("Symbol".into()));
    }

    #[test]
    fn invalid_utf8_names_the_tag() {
        let err = TypedValue::deserialize(TypeTag::String, None, &[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, TypeError::Decode { ref tag, .. } if tag == "String"));
    }

    proptest! {
        #[test]
        fn numbers_roundtrip(x in any::<f64>().prop_filter("NaN never compares equal", |x| !x.is_nan())) {
            prop_assert_eq!(roundtrip(TypedValue::Number(x)), TypedValue::Number(x));
        }

        #[test]
        fn strings_roundtrip(s in ".*") {
            prop_assert_eq!(roundtrip(TypedValue::String(s.clone())), TypedValue::String(s));
        }

        #[test]
        fn bytes_roundtrip(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(roundtrip(TypedValue::Bytes(bytes.clone())), TypedValue::Bytes(bytes));
        }
    }
}
