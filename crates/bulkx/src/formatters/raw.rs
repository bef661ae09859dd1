use super::Formatter;
use crate::common::Record;
use crate::error::FormatError;

/// 📦 The whole record, exactly as serde sees it. No field picking, no custom escaping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFormatter;

impl Formatter for RawFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        Ok(serde_json::to_vec(record)?)
    }
}
