//! 🧼 Only the fields you asked for, escaped byte-exact.
//!
//! Keys come out spelled exactly as configured (`Uuid`, `uuid`, `UUID` all match, and the
//! document uses whichever you wrote). `Fields` expands into every named field on the record.

use std::collections::HashSet;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::Formatter;
use crate::common::{FieldValue, Record};
use crate::error::FormatError;
use crate::escape::ObjectWriter;
use crate::layout::TimeLayout;

/// 📋 The ten built-ins, in the order they land in the document.
pub const DEFAULT_FIELDS: [&str; 10] = [
    "Uuid",
    "Timestamp",
    "Type",
    "Logger",
    "Severity",
    "Payload",
    "EnvVersion",
    "Pid",
    "Hostname",
    "Fields",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CleanField {
    Uuid,
    Timestamp,
    Type,
    Logger,
    Severity,
    Payload,
    EnvVersion,
    Pid,
    Hostname,
    Fields,
    Unknown,
}

impl CleanField {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "uuid" => Self::Uuid,
            "timestamp" => Self::Timestamp,
            "type" => Self::Type,
            "logger" => Self::Logger,
            "severity" => Self::Severity,
            "payload" => Self::Payload,
            "envversion" => Self::EnvVersion,
            "pid" => Self::Pid,
            "hostname" => Self::Hostname,
            "fields" => Self::Fields,
            _ => Self::Unknown,
        }
    }
}

/// 🧼 Writes `{"Uuid":"...","Timestamp":"...",...}` for each record.
#[derive(Debug, Clone)]
pub struct CleanFormatter {
    fields: Vec<(String, CleanField)>,
    timestamp_layout: TimeLayout,
    raw_bytes_fields: HashSet<String>,
}

impl CleanFormatter {
    /// An empty `fields` list means the ten defaults.
    pub fn new(fields: &[String], timestamp_layout: &str, raw_bytes_fields: &[String]) -> Self {
        let names: Vec<String> = if fields.is_empty() {
            DEFAULT_FIELDS.iter().map(|name| name.to_string()).collect()
        } else {
            fields.to_vec()
        };
        Self {
            fields: names
                .into_iter()
                .map(|name| {
                    let kind = CleanField::from_name(&name);
                    (name, kind)
                })
                .collect(),
            timestamp_layout: TimeLayout::parse(timestamp_layout),
            raw_bytes_fields: raw_bytes_fields.iter().cloned().collect(),
        }
    }

    fn write_fields(&self, object: &mut ObjectWriter<'_>, record: &Record) {
        for field in &record.fields {
            let name = field.name.as_bytes();
            if self.raw_bytes_fields.contains(&field.name) {
                match &field.value {
                    FieldValue::Bytes(raw) => {
                        object.raw_field(name, raw);
                        continue;
                    }
                    FieldValue::String(raw) => {
                        object.raw_field(name, raw.as_bytes());
                        continue;
                    }
                    _ => {}
                }
            }
            match &field.value {
                FieldValue::String(s) => object.string_field(name, s.as_bytes()),
                FieldValue::Bytes(b) => object.string_field(name, STANDARD.encode(b).as_bytes()),
                FieldValue::Integer(i) => object.raw_field(name, i.to_string().as_bytes()),
                FieldValue::Double(d) if d.is_finite() => {
                    object.raw_field(name, shortest_double(*d).as_bytes())
                }
                FieldValue::Double(_) => object.raw_field(name, b"null"),
                FieldValue::Bool(b) => object.raw_field(name, b.to_string().as_bytes()),
            }
        }
    }
}

impl Formatter for CleanFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        let mut buf = Vec::with_capacity(256);
        let mut object = ObjectWriter::open(&mut buf);
        for (name, kind) in &self.fields {
            let key = name.as_bytes();
            match kind {
                CleanField::Uuid => object.string_field(key, record.uuid_string().as_bytes()),
                CleanField::Timestamp => object.string_field(
                    key,
                    self.timestamp_layout.format_nanos(record.timestamp).as_bytes(),
                ),
                CleanField::Type => object.string_field(key, record.type_name.as_bytes()),
                CleanField::Logger => object.string_field(key, record.logger.as_bytes()),
                CleanField::Severity => object.raw_field(key, record.severity.to_string().as_bytes()),
                CleanField::Payload => {
                    // -- not text, not in the document
                    if std::str::from_utf8(&record.payload).is_ok() {
                        object.string_field(key, &record.payload);
                    }
                }
                CleanField::EnvVersion => object.string_field(key, record.env_version.as_bytes()),
                CleanField::Pid => object.raw_field(key, record.pid.to_string().as_bytes()),
                CleanField::Hostname => object.string_field(key, record.hostname.as_bytes()),
                CleanField::Fields => self.write_fields(&mut object, record),
                CleanField::Unknown => return Err(FormatError::UnknownField(name.clone())),
            }
        }
        object.close();
        Ok(buf)
    }
}

/// 🔢 Shortest digits that parse back to `d`. Plain decimal for exponents in `-4..6`,
/// `1.5e+07` / `1e-07` style outside it, the way log shippers usually print doubles.
fn shortest_double(d: f64) -> String {
    // -- `{:e}` already picks the shortest round-trip mantissa, we only reshape the exponent
    let scientific = format!("{d:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return d.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return d.to_string();
    };
    if (-4..6).contains(&exponent) {
        return d.to_string();
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Field;
    use crate::common::tests::record_with_funny_fields;

    const ISO: &str = "2006-01-02T15:04:05.000Z";

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn the_one_where_the_defaults_render_the_whole_record() -> anyhow::Result<()> {
        let formatter = CleanFormatter::new(&[], ISO, &[]);
        let doc = String::from_utf8(formatter.format(&record_with_funny_fields())?)?;
        assert_eq!(
            doc,
            concat!(
                r#"{"Uuid":"87cf1ac2-e810-4ddf-a02d-a5ce44d13a85","#,
                r#""Timestamp":"2013-07-16T15:49:05.070Z","#,
                r#""Type":"TEST","Logger":"edge-router","Severity":6,"#,
                r#""Payload":"Test Payload","EnvVersion":"0.8","Pid":14098,"#,
                r#""Hostname":"hostname","#,
                r#""\u0022foo":"bar\u000a","\u0022number":64,"idField":"1234"}"#
            )
        );
        Ok(())
    }

    #[test]
    fn the_one_where_an_unknown_field_sinks_the_document() {
        let formatter = CleanFormatter::new(&names(&["Type", "Mystery"]), ISO, &[]);
        match formatter.format(&record_with_funny_fields()) {
            Err(FormatError::UnknownField(name)) => assert_eq!(name, "Mystery"),
            other => panic!("💀 expected UnknownField, the formatter handed us {other:?} instead"),
        }
    }

    #[test]
    fn the_one_where_binary_payloads_are_left_out() -> anyhow::Result<()> {
        let formatter = CleanFormatter::new(&names(&["type", "payload"]), ISO, &[]);
        let mut record = record_with_funny_fields();
        record.payload = vec![0xff, 0xfe];
        assert_eq!(formatter.format(&record)?, br#"{"type":"TEST"}"#);
        Ok(())
    }

    #[test]
    fn the_one_where_every_field_type_gets_its_renderer() -> anyhow::Result<()> {
        let formatter = CleanFormatter::new(&names(&["Fields"]), ISO, &names(&["embedded"]));
        let mut record = Record::default();
        record.add_field(Field::new("s", FieldValue::String("x".into())));
        record.add_field(Field::new("b", FieldValue::Bytes(b"hi!".to_vec())));
        record.add_field(Field::new("i", FieldValue::Integer(-7)));
        record.add_field(Field::new("d", FieldValue::Double(1.5)));
        record.add_field(Field::new("whole", FieldValue::Double(64.0)));
        record.add_field(Field::new("nan", FieldValue::Double(f64::NAN)));
        record.add_field(Field::new("t", FieldValue::Bool(true)));
        record.add_field(Field::new("embedded", FieldValue::Bytes(br#"{"k":[1,2]}"#.to_vec())));
        let doc = String::from_utf8(formatter.format(&record)?)?;
        assert_eq!(
            doc,
            r#"{"s":"x","b":"aGkh","i":-7,"d":1.5,"whole":64,"nan":null,"t":true,"embedded":{"k":[1,2]}}"#
        );
        let parsed: serde_json::Value = serde_json::from_str(&doc)?;
        assert_eq!(parsed["embedded"]["k"][1], 2);
        Ok(())
    }

    #[test]
    fn the_one_where_huge_and_tiny_doubles_stay_short() -> anyhow::Result<()> {
        let formatter = CleanFormatter::new(&names(&["Fields"]), ISO, &[]);
        let mut record = Record::default();
        record.add_field(Field::new("big", FieldValue::Double(1e300)));
        record.add_field(Field::new("tiny", FieldValue::Double(1e-7)));
        record.add_field(Field::new("million", FieldValue::Double(1_234_567.0)));
        record.add_field(Field::new("neg", FieldValue::Double(-2.5e-5)));
        record.add_field(Field::new("small", FieldValue::Double(0.0001)));
        record.add_field(Field::new("round", FieldValue::Double(100_000.0)));
        let doc = String::from_utf8(formatter.format(&record)?)?;
        assert_eq!(
            doc,
            r#"{"big":1e+300,"tiny":1e-07,"million":1.234567e+06,"neg":-2.5e-05,"small":0.0001,"round":100000}"#
        );
        // 🔁 and the reshaped exponents are still numbers, both to JSON and to Rust
        let parsed: serde_json::Value = serde_json::from_str(&doc)?;
        assert!(parsed["big"].is_f64());
        assert_eq!("1e+300".parse::<f64>()?, 1e300);
        assert_eq!("1.234567e+06".parse::<f64>()?, 1_234_567.0);
        Ok(())
    }

    #[test]
    fn the_one_where_keys_keep_the_configured_spelling() -> anyhow::Result<()> {
        let formatter = CleanFormatter::new(&names(&["PID", "severity"]), ISO, &[]);
        assert_eq!(
            formatter.format(&record_with_funny_fields())?,
            br#"{"PID":14098,"severity":6}"#
        );
        Ok(())
    }

    #[test]
    fn the_one_where_invalid_field_strings_still_make_valid_json() -> anyhow::Result<()> {
        let formatter = CleanFormatter::new(&names(&["Fields"]), ISO, &[]);
        let mut record = Record::default();
        record.add_field(Field::new("blob", FieldValue::Bytes(vec![0xa3])));
        record.add_field(Field::new("tab\tname", FieldValue::String("v".into())));
        let doc = formatter.format(&record)?;
        let parsed: serde_json::Value = serde_json::from_slice(&doc)?;
        assert_eq!(parsed["blob"], "ow==");
        assert_eq!(parsed["tab\tname"], "v");
        Ok(())
    }
}
