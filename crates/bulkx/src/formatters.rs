//! 📄 Formatters. One record in, one document body out.
//!
//! Three flavors, picked once from the `format` config string:
//!
//! | format    | Formatter          | Document                                     |
//! |-----------|--------------------|----------------------------------------------|
//! | `raw`     | [`RawFormatter`]   | the whole record, serde-style                |
//! | `payload` | [`PayloadFormatter`] | the payload bytes, untouched               |
//! | `clean`   | [`CleanFormatter`] | a hand-escaped object of the chosen fields   |
//!
//! Same shape as the indexers: a trait per behavior, a closed enum that dispatches, and
//! nobody downstream ever asks which one they got. 🦆

use tracing::warn;

use crate::common::Record;
use crate::error::FormatError;

pub mod clean;
pub mod payload;
pub mod raw;

pub use clean::CleanFormatter;
pub use payload::PayloadFormatter;
pub use raw::RawFormatter;

/// 📄 Turns a record into the second line of a bulk action.
pub trait Formatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError>;
}

/// 🎭 The formatter the pipeline actually holds.
#[derive(Debug, Clone)]
pub enum FormatterBackend {
    Raw(RawFormatter),
    Payload(PayloadFormatter),
    Clean(CleanFormatter),
}

impl FormatterBackend {
    /// 🔧 Pick a formatter by name, case-insensitively. Unknown names get `raw`, with a warning.
    pub fn from_name(
        format: &str,
        fields: &[String],
        timestamp_layout: &str,
        raw_bytes_fields: &[String],
    ) -> Self {
        match format.to_ascii_lowercase().as_str() {
            "clean" => Self::Clean(CleanFormatter::new(fields, timestamp_layout, raw_bytes_fields)),
            "payload" => Self::Payload(PayloadFormatter),
            "raw" => Self::Raw(RawFormatter),
            other => {
                warn!("⚠️ unknown format '{}', falling back to raw", other);
                Self::Raw(RawFormatter)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Raw(_) => "raw",
            Self::Payload(_) => "payload",
            Self::Clean(_) => "clean",
        }
    }
}

impl Formatter for FormatterBackend {
    #[inline]
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        match self {
            Self::Raw(f) => f.format(record),
            Self::Payload(f) => f.format(record),
            Self::Clean(f) => f.format(record),
        }
    }
}
