//! 🔡 Strict JSON string literals, the hard way.
//!
//! `serde_json` is a fine encoder. It is also polite: it uses the short escapes (`\n`, `\"`)
//! and it flat out refuses bytes that are not UTF-8. The records we ship are not polite.
//! Field names arrive with quotes in them, payloads arrive half-binary, and the store on the
//! other end wants one exact byte layout. So we write our own.
//!
//! The rules:
//! - `0x20`, `0x21`, `0x23..=0x5B` and `0x5D..` pass through as-is.
//! - everything else (control characters, `"` and `\` included) becomes `\uXXXX`, lowercase hex.
//! - every invalid UTF-8 sequence becomes one U+FFFD, which then passes through literally.

const LOWER_HEX: &[u8; 16] = b"0123456789abcdef";

#[inline]
fn passes_through(c: char) -> bool {
    c == '\u{20}' || c == '\u{21}' || ('\u{23}'..='\u{5B}').contains(&c) || c >= '\u{5D}'
}

fn write_utf16_escape(buf: &mut Vec<u8>, c: char) {
    // -- only code points below 0x5D get here, four hex digits is always enough
    let c = c as u32;
    buf.extend_from_slice(b"\\u");
    buf.push(LOWER_HEX[((c >> 12) & 0xF) as usize]);
    buf.push(LOWER_HEX[((c >> 8) & 0xF) as usize]);
    buf.push(LOWER_HEX[((c >> 4) & 0xF) as usize]);
    buf.push(LOWER_HEX[(c & 0xF) as usize]);
}

/// 📝 Appends `value` to `buf` as a quoted JSON string literal.
pub fn write_quoted_string(buf: &mut Vec<u8>, value: &[u8]) {
    buf.push(b'"');
    for chunk in value.utf8_chunks() {
        for c in chunk.valid().chars() {
            if passes_through(c) {
                let mut utf8 = [0u8; 4];
                buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            } else {
                write_utf16_escape(buf, c);
            }
        }
        if !chunk.invalid().is_empty() {
            buf.extend_from_slice(char::REPLACEMENT_CHARACTER.encode_utf8(&mut [0u8; 4]).as_bytes());
        }
    }
    buf.push(b'"');
}

/// 🔖 `"name":"value"`, with a leading comma unless this is the first field of the object.
pub fn write_string_field(buf: &mut Vec<u8>, first: bool, name: &[u8], value: &[u8]) {
    if !first {
        buf.push(b',');
    }
    write_quoted_string(buf, name);
    buf.push(b':');
    write_quoted_string(buf, value);
}

/// 🔖 `"name":raw`. The value goes in verbatim: numbers, bools, pre-serialized JSON.
pub fn write_raw_field(buf: &mut Vec<u8>, first: bool, name: &[u8], raw: &[u8]) {
    if !first {
        buf.push(b',');
    }
    write_quoted_string(buf, name);
    buf.push(b':');
    buf.extend_from_slice(raw);
}

/// 🏗️ Writes one JSON object into a buffer, remembering whether a comma is due.
///
/// `open` writes the `{`, `close` writes the `}`. In between, call the field methods in
/// the order the keys should appear.
pub struct ObjectWriter<'a> {
    buf: &'a mut Vec<u8>,
    first: bool,
}

impl<'a> ObjectWriter<'a> {
    pub fn open(buf: &'a mut Vec<u8>) -> Self {
        buf.push(b'{');
        Self { buf, first: true }
    }

    pub fn string_field(&mut self, name: &[u8], value: &[u8]) {
        write_string_field(self.buf, self.first, name, value);
        self.first = false;
    }

    pub fn raw_field(&mut self, name: &[u8], raw: &[u8]) {
        write_raw_field(self.buf, self.first, name, raw);
        self.first = false;
    }

    /// 🪆 Opens a nested object under `name`. Finish it with `close` before touching `self` again.
    pub fn object_field(&mut self, name: &[u8]) -> ObjectWriter<'_> {
        if !self.first {
            self.buf.push(b',');
        }
        self.first = false;
        write_quoted_string(self.buf, name);
        self.buf.push(b':');
        ObjectWriter::open(self.buf)
    }

    pub fn close(self) {
        self.buf.push(b'}');
    }
}
