//! 📦 Common data structures, the building blocks of bulkx.
//!
//! A `Record` is one structured event from the host pipeline: a timestamp, a uuid, a handful
//! of well-known attributes, a payload that may or may not be valid UTF-8, and an ordered bag
//! of typed fields. The core only ever reads a record. It moves in, gets rendered into a bulk
//! action, and is dropped. That drop *is* the release back to whoever produced it. 🦆

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// 📦 One structured log/event record.
///
/// `timestamp` is nanoseconds since the UNIX epoch, UTC. `payload` is raw bytes on purpose:
/// the clean formatter has to be able to notice when it is not text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub uuid: Uuid,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub logger: String,
    #[serde(default)]
    pub severity: i32,
    #[serde(
        default,
        serialize_with = "serialize_lossy",
        deserialize_with = "deserialize_text_bytes"
    )]
    pub payload: Vec<u8>,
    #[serde(default)]
    pub env_version: String,
    #[serde(default)]
    pub pid: i32,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// 🏷️ A named, typed, single-valued field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub value: FieldValue,
}

/// 🎭 The five shapes a field value can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "value_type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    String(String),
    Bytes(Vec<u8>),
    Integer(i64),
    Double(f64),
    Bool(bool),
}

impl Field {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl FieldValue {
    /// 🔤 The value as plain text, the way interpolation wants it.
    /// Bytes are decoded lossily; numbers and bools use their natural form.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Double(d) => d.to_string(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }
}

impl Record {
    /// 🔍 First field with this exact name, if any.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// 🆔 Hyphenated lowercase uuid, e.g. `87cf1ac2-e810-4ddf-a02d-a5ce44d13a85`.
    pub fn uuid_string(&self) -> String {
        self.uuid.hyphenated().to_string()
    }
}

// -- 🧼 payload goes out as a string, even when it is not quite one
fn serialize_lossy<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

fn deserialize_text_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let text = String::deserialize(deserializer)?;
    Ok(text.into_bytes())
}
