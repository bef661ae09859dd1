use super::Formatter;
use crate::common::Record;
use crate::error::FormatError;

/// 📨 The payload is the document. Whether it is valid JSON is the sender's problem.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadFormatter;

impl Formatter for PayloadFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        Ok(record.payload.clone())
    }
}
