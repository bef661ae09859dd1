//! 🧩 `%{...}` placeholders in index names, type names and document ids.
//!
//! Each placeholder NAME resolves, in order, to:
//! 1. a reserved record attribute: `Type`, `Hostname`, `Pid`, `UUID`, `Logger`,
//!    `EnvVersion`, `Severity`;
//! 2. a record field called NAME;
//! 3. NAME rendered as a reference-time layout (see [`crate::layout`]), against either the
//!    record's timestamp or the wall clock.
//!
//! If the rendered text is NAME itself, whichever step produced it, nothing changed it. The literal name stays in the
//! output and the caller gets an [`InterpolationError`] next to the partial result, so it can
//! decide whether "heka-idFail" is a good enough index name. (It usually is not.)

use chrono::Utc;
use memchr::{memchr, memmem};

use crate::common::Record;
use crate::error::InterpolationError;
use crate::layout::TimeLayout;

/// ⏰ Which instant time-layout placeholders should render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    WallClock,
    /// UNIX-epoch nanoseconds taken from the record.
    Record(i64),
}

impl Clock {
    fn render(self, layout: &str) -> String {
        let layout = TimeLayout::parse(layout);
        match self {
            Clock::WallClock => layout.format(&Utc::now()),
            Clock::Record(nanos) => layout.format_nanos(nanos),
        }
    }
}

/// 📦 The rendered string, plus the error if any placeholder stayed unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolated {
    pub value: String,
    pub error: Option<InterpolationError>,
}

impl Interpolated {
    /// The value only when every placeholder resolved.
    pub fn into_result(self) -> Result<String, InterpolationError> {
        match self.error {
            None => Ok(self.value),
            Some(err) => Err(err),
        }
    }
}

/// 🚀 Resolve every `%{NAME}` in `template` against `record`.
///
/// An unterminated `%{` is plain text. So is a `%{` that is followed by another `%{`
/// before its closing brace; the second one is the placeholder.
pub fn interpolate(template: &str, record: &Record, clock: Clock) -> Interpolated {
    let mut value = String::with_capacity(template.len());
    let mut error = None;
    let mut rest = template;

    while let Some(start) = memmem::find(rest.as_bytes(), b"%{") {
        value.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = memchr(b'}', after.as_bytes()) else {
            value.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let name = &after[..end];
        if let Some(nested) = memmem::find(name.as_bytes(), b"%{") {
            value.push_str(&rest[start..start + 2 + nested]);
            rest = &after[nested..];
            continue;
        }

        match resolve(name, record, clock) {
            Some(rendered) => value.push_str(&rendered),
            None => {
                value.push_str(name);
                error = Some(InterpolationError {
                    template: template.to_string(),
                });
            }
        }
        rest = &after[end + 1..];
    }
    value.push_str(rest);

    Interpolated { value, error }
}

fn resolve(name: &str, record: &Record, clock: Clock) -> Option<String> {
    let rendered = match name {
        "Type" => record.type_name.clone(),
        "Hostname" => record.hostname.clone(),
        "Pid" => record.pid.to_string(),
        "UUID" => record.uuid_string(),
        "Logger" => record.logger.clone(),
        "EnvVersion" => record.env_version.clone(),
        "Severity" => record.severity.to_string(),
        _ => match record.field(name) {
            Some(value) => value.to_text(),
            None => clock.render(name),
        },
    };
    // -- whoever answered, an answer that just repeats the question is no answer
    (rendered != name).then_some(rendered)
}
