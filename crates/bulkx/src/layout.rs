//! 🕰️ Reference-time layouts, or "show me what Mon Jan 2 15:04:05 MST 2006 looks like".
//!
//! Index names like `heka-%{2006.01.02}` and timestamp formats like
//! `2006-01-02T15:04:05.000Z` describe a date by writing out one fixed reference instant
//! (January 2nd, 15:04:05, 2006, offset -0700) in the shape you want. Every recognised
//! piece of that instant is a token; everything else is literal text.
//!
//! We parse the layout once into [`Chunk`]s and render any UTC instant through them.
//! Times are always rendered in UTC, so zone tokens collapse to `UTC` / `+0000` / `Z`.
//!
//! 🦆 Yes, the whole date language is one specific Tuesday afternoon. No, we did not pick it.

use std::fmt::Write as _;

use chrono::{DateTime, Datelike, Timelike, Utc};

const LONG_MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const LONG_DAYS: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// 🧩 One piece of a parsed layout.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk {
    Literal(String),
    LongYear,
    Year,
    LongMonth,
    Month,
    NumMonth,
    ZeroMonth,
    LongWeekDay,
    WeekDay,
    Day,
    UnderDay,
    ZeroDay,
    UnderYearDay,
    ZeroYearDay,
    Hour,
    Hour12,
    ZeroHour12,
    Minute,
    ZeroMinute,
    Second,
    ZeroSecond,
    Meridiem { upper: bool },
    ZoneName,
    /// `-0700` and friends. `iso` variants print `Z` for UTC.
    ZoneOffset { text: &'static str, iso: bool },
    Fraction { separator: char, digits: usize, trim: bool },
}

/// 📐 A parsed reference-time layout, ready to render instants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLayout {
    chunks: Vec<Chunk>,
}

impl TimeLayout {
    /// 🔍 Never fails. A layout with no tokens in it is just a very confident literal.
    pub fn parse(layout: &str) -> Self {
        let mut chunks = Vec::new();
        let mut literal = String::new();
        let mut rest = layout;

        while let Some(c) = rest.chars().next() {
            match next_token(rest) {
                Some((chunk, consumed)) => {
                    if !literal.is_empty() {
                        chunks.push(Chunk::Literal(std::mem::take(&mut literal)));
                    }
                    chunks.push(chunk);
                    rest = &rest[consumed..];
                }
                // -- not a token, so it joins whatever literal run we are building
                None => {
                    literal.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        }
        if !literal.is_empty() {
            chunks.push(Chunk::Literal(literal));
        }
        Self { chunks }
    }

    /// ⏱️ Render a UNIX-epoch nanosecond timestamp.
    pub fn format_nanos(&self, nanos: i64) -> String {
        self.format(&DateTime::from_timestamp_nanos(nanos))
    }

    /// 📅 Render `instant`, chunk by chunk.
    pub fn format(&self, instant: &DateTime<Utc>) -> String {
        let mut out = String::with_capacity(32);
        for chunk in &self.chunks {
            // -- write! into a String cannot fail
            let _ = match chunk {
                Chunk::Literal(text) => {
                    out.push_str(text);
                    Ok(())
                }
                Chunk::LongYear => write!(out, "{:04}", instant.year()),
                Chunk::Year => write!(out, "{:02}", instant.year().rem_euclid(100)),
                Chunk::LongMonth => {
                    out.push_str(LONG_MONTHS[instant.month0() as usize]);
                    Ok(())
                }
                Chunk::Month => {
                    out.push_str(&LONG_MONTHS[instant.month0() as usize][..3]);
                    Ok(())
                }
                Chunk::NumMonth => write!(out, "{}", instant.month()),
                Chunk::ZeroMonth => write!(out, "{:02}", instant.month()),
                Chunk::LongWeekDay => {
                    out.push_str(LONG_DAYS[instant.weekday().num_days_from_monday() as usize]);
                    Ok(())
                }
                Chunk::WeekDay => {
                    out.push_str(&LONG_DAYS[instant.weekday().num_days_from_monday() as usize][..3]);
                    Ok(())
                }
                Chunk::Day => write!(out, "{}", instant.day()),
                Chunk::UnderDay => write!(out, "{:>2}", instant.day()),
                Chunk::ZeroDay => write!(out, "{:02}", instant.day()),
                Chunk::UnderYearDay => write!(out, "{:>3}", instant.ordinal()),
                Chunk::ZeroYearDay => write!(out, "{:03}", instant.ordinal()),
                Chunk::Hour => write!(out, "{:02}", instant.hour()),
                Chunk::Hour12 => write!(out, "{}", instant.hour12().1),
                Chunk::ZeroHour12 => write!(out, "{:02}", instant.hour12().1),
                Chunk::Minute => write!(out, "{}", instant.minute()),
                Chunk::ZeroMinute => write!(out, "{:02}", instant.minute()),
                Chunk::Second => write!(out, "{}", instant.second()),
                Chunk::ZeroSecond => write!(out, "{:02}", instant.second()),
                // 🌅 the only token that cares about shouting
                Chunk::Meridiem { upper } => {
                    let pm = instant.hour12().0;
                    out.push_str(match (pm, *upper) {
                        (true, true) => "PM",
                        (false, true) => "AM",
                        (true, false) => "pm",
                        (false, false) => "am",
                    });
                    Ok(())
                }
                // 🌍 everything is UTC here. the server room has no windows anyway.
                Chunk::ZoneName => {
                    out.push_str("UTC");
                    Ok(())
                }
                Chunk::ZoneOffset { text, iso } => {
                    out.push_str(if *iso { "Z" } else { *text });
                    Ok(())
                }
                Chunk::Fraction {
                    separator,
                    digits,
                    trim,
                } => {
                    // -- leap seconds show up as nanos >= 1e9, fold them back
                    let nanos = format!("{:09}", instant.nanosecond() % 1_000_000_000);
                    let mut fraction = &nanos[..*digits];
                    if *trim {
                        fraction = fraction.trim_end_matches('0');
                    }
                    if !fraction.is_empty() {
                        out.push(*separator);
                        out.push_str(fraction);
                    }
                    Ok(())
                }
            };
        }
        out
    }
}

/// 🔍 Is there a token at the start of `s`? Returns it and how many bytes it spans.
fn next_token(s: &str) -> Option<(Chunk, usize)> {
    let b = s.as_bytes();
    let starts = |prefix: &str| s.starts_with(prefix);
    // -- longest match first within each leading byte: `January` before `Jan`, `2006` before `2`
    match b[0] {
        b'J' if starts("January") => Some((Chunk::LongMonth, 7)),
        b'J' if starts("Jan") => Some((Chunk::Month, 3)),
        b'M' if starts("Monday") => Some((Chunk::LongWeekDay, 6)),
        b'M' if starts("Mon") => Some((Chunk::WeekDay, 3)),
        b'M' if starts("MST") => Some((Chunk::ZoneName, 3)),
        b'0' if starts("002") => Some((Chunk::ZeroYearDay, 3)),
        b'0' if b.len() >= 2 && (b'1'..=b'6').contains(&b[1]) => {
            let chunk = match b[1] {
                b'1' => Chunk::ZeroMonth,
                b'2' => Chunk::ZeroDay,
                b'3' => Chunk::ZeroHour12,
                b'4' => Chunk::ZeroMinute,
                b'5' => Chunk::ZeroSecond,
                _ => Chunk::Year,
            };
            Some((chunk, 2))
        }
        b'1' if starts("15") => Some((Chunk::Hour, 2)),
        b'1' => Some((Chunk::NumMonth, 1)),
        b'2' if starts("2006") => Some((Chunk::LongYear, 4)),
        b'2' => Some((Chunk::Day, 1)),
        // -- `_2006` is an underscore followed by a year, not a padded day
        b'_' if starts("_2006") => None,
        b'_' if starts("__2") => Some((Chunk::UnderYearDay, 3)),
        b'_' if starts("_2") => Some((Chunk::UnderDay, 2)),
        b'3' => Some((Chunk::Hour12, 1)),
        b'4' => Some((Chunk::Minute, 1)),
        b'5' => Some((Chunk::Second, 1)),
        b'P' if starts("PM") => Some((Chunk::Meridiem { upper: true }, 2)),
        b'p' if starts("pm") => Some((Chunk::Meridiem { upper: false }, 2)),
        b'-' | b'Z' => zone_offset(s),
        b'.' | b',' => fraction(s),
        _ => None,
    }
}

/// 🌐 `-0700` style offsets, or `Z0700` style ones that print `Z` for UTC.
fn zone_offset(s: &str) -> Option<(Chunk, usize)> {
    const OFFSETS: [(&str, &str); 5] = [
        ("070000", "+000000"),
        ("07:00:00", "+00:00:00"),
        ("0700", "+0000"),
        ("07:00", "+00:00"),
        ("07", "+00"),
    ];
    let iso = s.starts_with('Z');
    let tail = &s[1..];
    OFFSETS.iter().find_map(|(pattern, text)| {
        tail.starts_with(*pattern)
            .then_some((Chunk::ZoneOffset { text: *text, iso }, 1 + pattern.len()))
    })
}

/// ⏱️ `.000` keeps trailing zeros, `.999` trims them. A run glued to more digits is literal.
fn fraction(s: &str) -> Option<(Chunk, usize)> {
    let b = s.as_bytes();
    let separator = b[0] as char;
    let digit = *b.get(1)?;
    if digit != b'0' && digit != b'9' {
        return None;
    }
    let run = b[1..].iter().take_while(|&&d| d == digit).count();
    let followed_by_digit = b.get(1 + run).is_some_and(u8::is_ascii_digit);
    if followed_by_digit || run > 9 {
        return None;
    }
    Some((
        Chunk::Fraction {
            separator,
            digits: run,
            trim: digit == b'9',
        },
        1 + run,
    ))
}
