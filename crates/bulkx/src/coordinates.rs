//! 📍 Where a document goes: `_index`, `_type`, maybe `_id`, maybe `_timestamp`.
//!
//! Rendered once per record as the first line of a bulk action:
//!
//! ```text
//! {"index":{"_index":"heka-2013.07.16","_type":"message","_id":"1234","_timestamp":"..."}}
//! ```

use tracing::{debug, warn};

use crate::common::Record;
use crate::escape::ObjectWriter;
use crate::interpolate::{Clock, interpolate};
use crate::layout::TimeLayout;

/// 📍 The per-record bulk action header, before rendering.
#[derive(Debug, Clone, Default)]
pub struct Coordinates<'a> {
    pub index: &'a str,
    pub type_name: &'a str,
    /// Empty means "let the store pick an id".
    pub id: &'a str,
    /// UNIX-epoch nanoseconds.
    pub timestamp: Option<i64>,
    pub timestamp_layout: Option<&'a TimeLayout>,
    pub index_from_timestamp: bool,
}

impl Coordinates<'_> {
    /// ⏰ Record time if asked for and available, wall clock otherwise.
    pub fn clock(&self) -> Clock {
        match (self.index_from_timestamp, self.timestamp) {
            (true, Some(nanos)) => Clock::Record(nanos),
            _ => Clock::WallClock,
        }
    }

    /// 📝 Append the rendered header (no trailing newline) to `buf`.
    ///
    /// Index and type always render, unresolved placeholders and all. An id that fails to
    /// interpolate is dropped so the store assigns one.
    pub fn write_to(&self, buf: &mut Vec<u8>, record: &Record) {
        let clock = self.clock();

        let index = interpolate(self.index, record, clock);
        if let Some(err) = &index.error {
            warn!("⚠️ index name fell back to '{}': {}", index.value, err);
        }
        let type_name = interpolate(self.type_name, record, clock);
        if let Some(err) = &type_name.error {
            warn!("⚠️ type name fell back to '{}': {}", type_name.value, err);
        }

        let mut outer = ObjectWriter::open(buf);
        let mut action = outer.object_field(b"index");
        action.string_field(b"_index", index.value.as_bytes());
        action.string_field(b"_type", type_name.value.as_bytes());

        if !self.id.is_empty() {
            match interpolate(self.id, record, clock).into_result() {
                Ok(id) => action.string_field(b"_id", id.as_bytes()),
                Err(err) => debug!("🆔 no _id for this one, the store gets to pick: {}", err),
            }
        }

        if let (Some(nanos), Some(layout)) = (self.timestamp, self.timestamp_layout) {
            action.string_field(b"_timestamp", layout.format_nanos(nanos).as_bytes());
        }

        action.close();
        outer.close();
    }

    pub fn to_bytes(&self, record: &Record) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);
        self.write_to(&mut buf, record);
        buf
    }
}

/// 🗺️ The configured index/type/id templates, owned, ready to stamp out a
/// [`Coordinates`] per record.
#[derive(Debug, Clone)]
pub struct CoordinateTemplate {
    pub index: String,
    pub type_name: String,
    pub id: String,
    /// `None` leaves `_timestamp` out of every header.
    pub timestamp_layout: Option<TimeLayout>,
    pub index_from_timestamp: bool,
}

impl CoordinateTemplate {
    pub fn for_record(&self, record: &Record) -> Coordinates<'_> {
        Coordinates {
            index: &self.index,
            type_name: &self.type_name,
            id: &self.id,
            timestamp: Some(record.timestamp),
            timestamp_layout: self.timestamp_layout.as_ref(),
            index_from_timestamp: self.index_from_timestamp,
        }
    }
}
