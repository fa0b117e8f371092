//! The closed value model carried inside frame payloads.
//!
//! A child can only ever describe one of these variants. Decoding a payload
//! either yields a [`Message`] or fails with a serialization error; there is
//! no way for the bytes to name a type the parent did not already know about.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

/// A structured event value.
///
/// Serialized adjacently tagged, e.g. `{"type":"int","value":42}`.
///
/// `Float` must be finite: JSON has no NaN or infinity, so encoding one is a
/// serialization error rather than a silent `null`. `Bytes` travels as a
/// JSON array of numbers, roughly four times the raw size; prefer `Text`
/// (or base64 in a `Text`) for large blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Message {
    Null,
    Bool(bool),
    Int(i64),
    #[serde(serialize_with = "serialize_finite")]
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<Message>),
    Map(BTreeMap<String, Message>),
}

impl Message {
    /// Build a `Map` from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Message)>,
    {
        Message::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short name of the variant, as it appears in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Null => "null",
            Message::Bool(_) => "bool",
            Message::Int(_) => "int",
            Message::Float(_) => "float",
            Message::Text(_) => "text",
            Message::Bytes(_) => "bytes",
            Message::List(_) => "list",
            Message::Map(_) => "map",
        }
    }

    /// Look up a key when this is a `Map`.
    pub fn get(&self, key: &str) -> Option<&Message> {
        match self {
            Message::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Message::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(value) => Some(value),
            _ => None,
        }
    }
}

fn serialize_finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if !value.is_finite() {
        return Err(serde::ser::Error::custom(format!(
            "non-finite float {value} has no JSON representation"
        )));
    }
    serializer.serialize_f64(*value)
}

impl From<bool> for Message {
    fn from(value: bool) -> Self {
        Message::Bool(value)
    }
}

impl From<i64> for Message {
    fn from(value: i64) -> Self {
        Message::Int(value)
    }
}

impl From<f64> for Message {
    fn from(value: f64) -> Self {
        Message::Float(value)
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::Text(value.to_string())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::Text(value)
    }
}

impl From<Vec<u8>> for Message {
    fn from(value: Vec<u8>) -> Self {
        Message::Bytes(value)
    }
}

impl From<Vec<Message>> for Message {
    fn from(value: Vec<Message>) -> Self {
        Message::List(value)
    }
}

/// Plain JSON maps onto the value model: integers that fit `i64` become
/// `Int`, every other number becomes `Float`. A number with no `f64` form
/// is kept verbatim as `Text`.
impl From<serde_json::Value> for Message {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Message::Null,
            serde_json::Value::Bool(b) => Message::Bool(b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Message::Int(i),
                (None, Some(f)) => Message::Float(f),
                (None, None) => Message::Text(n.to_string()),
            },
            serde_json::Value::String(s) => Message::Text(s),
            serde_json::Value::Array(items) => {
                Message::List(items.into_iter().map(Message::from).collect())
            }
            serde_json::Value::Object(entries) => Message::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Message::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_uses_adjacent_tag() {
        let json = serde_json::to_string(&Message::Int(42)).unwrap();
        assert_eq!(json, r#"{"type":"int","value":42}"#);
    }

    #[test]
    fn null_has_no_value_field() {
        let json = serde_json::to_string(&Message::Null).unwrap();
        assert_eq!(json, r#"{"type":"null"}"#);
    }

    #[test]
    fn nested_record_roundtrip() {
        let record = Message::map([
            ("path", Message::from("/tmp/a.txt")),
            ("size", Message::Int(512)),
            ("flags", Message::List(vec![Message::from("r"), Message::from("w")])),
            ("raw", Message::Bytes(vec![0, 255])),
        ]);

        let bytes = serde_json::to_vec(&record).unwrap();
        let back: Message = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.get("size").and_then(Message::as_int), Some(512));
    }

    #[test]
    fn finite_float_roundtrip() {
        let json = serde_json::to_string(&Message::Float(-2.5)).unwrap();
        assert_eq!(json, r#"{"type":"float","value":-2.5}"#);
        assert_eq!(
            serde_json::from_str::<Message>(&json).unwrap(),
            Message::Float(-2.5)
        );
    }

    #[test]
    fn non_finite_floats_fail_to_serialize() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(serde_json::to_vec(&Message::Float(value)).is_err());
            let nested = Message::List(vec![Message::Int(1), Message::Float(value)]);
            assert!(serde_json::to_vec(&nested).is_err());
        }
    }

    #[test]
    fn large_unsigned_json_number_becomes_float() {
        let message = Message::from(serde_json::json!(u64::MAX));
        assert_eq!(message, Message::Float(u64::MAX as f64));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = serde_json::from_str::<Message>(r#"{"type":"object","value":"os.system"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn untagged_json_is_rejected() {
        assert!(serde_json::from_str::<Message>("42").is_err());
    }

    #[test]
    fn converts_plain_json() {
        let value = serde_json::json!({"k": "v", "n": 3, "x": 1.5, "l": [true, null]});
        let message = Message::from(value);

        assert_eq!(message.get("k").and_then(Message::as_text), Some("v"));
        assert_eq!(message.get("n"), Some(&Message::Int(3)));
        assert_eq!(message.get("x"), Some(&Message::Float(1.5)));
        assert_eq!(
            message.get("l"),
            Some(&Message::List(vec![Message::Bool(true), Message::Null]))
        );
        assert_eq!(message.kind(), "map");
    }
}
