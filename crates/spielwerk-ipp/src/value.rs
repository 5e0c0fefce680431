// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tagged IPP values and their binary representation (RFC 2910 §3.9).
//
// The payload shape is fully determined by the value tag.  Decoding checks
// the byte length against the tag's fixed width; encoding is the exact
// inverse.  Strings are carried byte-for-byte with no transcoding.

use chrono::{DateTime, Datelike, Timelike, Utc};

use spielwerk_core::error::{Result, SpielwerkError};

use crate::constants::ValueTag;

/// Largest payload a value-length field can describe.
pub const MAX_VALUE_LEN: usize = u16::MAX as usize;

/// RFC 2579 DateAndTime, the 11-byte `dateTime` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeRecord {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub deci_seconds: u8,
    /// `b'+'` or `b'-'`.
    pub utc_direction: u8,
    pub utc_hours: u8,
    pub utc_minutes: u8,
}

impl DateTimeRecord {
    fn to_bytes(self) -> [u8; 11] {
        let [y0, y1] = self.year.to_be_bytes();
        [
            y0,
            y1,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.deci_seconds,
            self.utc_direction,
            self.utc_hours,
            self.utc_minutes,
        ]
    }

    fn from_bytes(b: &[u8]) -> Result<Self> {
        if b[8] != b'+' && b[8] != b'-' {
            return Err(SpielwerkError::MalformedValue(format!(
                "dateTime direction byte 0x{:02x}",
                b[8]
            )));
        }
        Ok(Self {
            year: u16::from_be_bytes([b[0], b[1]]),
            month: b[2],
            day: b[3],
            hour: b[4],
            minute: b[5],
            second: b[6],
            deci_seconds: b[7],
            utc_direction: b[8],
            utc_hours: b[9],
            utc_minutes: b[10],
        })
    }
}

impl From<DateTime<Utc>> for DateTimeRecord {
    fn from(t: DateTime<Utc>) -> Self {
        Self {
            year: u16::try_from(t.year()).unwrap_or(0),
            month: t.month() as u8,
            day: t.day() as u8,
            hour: t.hour() as u8,
            minute: t.minute() as u8,
            // leap seconds show up as nanosecond overflow; clamp to 60
            second: t.second().min(60) as u8,
            deci_seconds: ((t.nanosecond() / 100_000_000).min(9)) as u8,
            utc_direction: b'+',
            utc_hours: 0,
            utc_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Payload {
    Empty,
    Integer(i32),
    Boolean(bool),
    Range { lower: i32, upper: i32 },
    DateTime(DateTimeRecord),
    Resolution { cross_feed: i32, feed: i32, units: i8 },
    WithLanguage { language: Vec<u8>, text: Vec<u8> },
    Text(Vec<u8>),
    Octets(Vec<u8>),
}

/// One IPP value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    tag: ValueTag,
    payload: Payload,
}

fn be_i32(b: &[u8]) -> i32 {
    i32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

impl Value {
    /// Decode `bytes` as a value of type `tag`.
    pub fn decode(tag: ValueTag, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_VALUE_LEN {
            return Err(SpielwerkError::MalformedValue(format!(
                "{} byte value exceeds the value-length field",
                bytes.len()
            )));
        }
        if let Some(width) = tag.fixed_width() {
            if bytes.len() != width {
                return Err(SpielwerkError::MalformedValue(format!(
                    "tag {tag} needs {width} bytes, got {}",
                    bytes.len()
                )));
            }
        }

        let payload = match tag {
            t if t.is_out_of_band() => Payload::Empty,
            ValueTag::INTEGER | ValueTag::ENUM => Payload::Integer(be_i32(bytes)),
            ValueTag::BOOLEAN => match bytes[0] {
                0x00 => Payload::Boolean(false),
                0x01 => Payload::Boolean(true),
                other => {
                    return Err(SpielwerkError::MalformedValue(format!(
                        "boolean byte 0x{other:02x}"
                    )));
                }
            },
            ValueTag::RANGE_OF_INTEGER => Payload::Range {
                lower: be_i32(&bytes[0..4]),
                upper: be_i32(&bytes[4..8]),
            },
            ValueTag::RESOLUTION => Payload::Resolution {
                cross_feed: be_i32(&bytes[0..4]),
                feed: be_i32(&bytes[4..8]),
                units: bytes[8] as i8,
            },
            ValueTag::DATE_TIME => Payload::DateTime(DateTimeRecord::from_bytes(bytes)?),
            ValueTag::TEXT_WITH_LANGUAGE | ValueTag::NAME_WITH_LANGUAGE => {
                decode_with_language(bytes)?
            }
            t if t.code() >= 0x40 && t.code() <= 0x5f => Payload::Text(bytes.to_vec()),
            // octetString, collections, and anything unassigned pass through
            _ => Payload::Octets(bytes.to_vec()),
        };
        Ok(Self { tag, payload })
    }

    /// Binary payload of this value (without tag or length).
    pub fn encode(&self) -> Vec<u8> {
        match &self.payload {
            Payload::Empty => Vec::new(),
            Payload::Integer(v) => v.to_be_bytes().to_vec(),
            Payload::Boolean(b) => vec![u8::from(*b)],
            Payload::Range { lower, upper } => {
                let mut out = Vec::with_capacity(8);
                out.extend_from_slice(&lower.to_be_bytes());
                out.extend_from_slice(&upper.to_be_bytes());
                out
            }
            Payload::Resolution {
                cross_feed,
                feed,
                units,
            } => {
                let mut out = Vec::with_capacity(9);
                out.extend_from_slice(&cross_feed.to_be_bytes());
                out.extend_from_slice(&feed.to_be_bytes());
                out.push(*units as u8);
                out
            }
            Payload::DateTime(dt) => dt.to_bytes().to_vec(),
            Payload::WithLanguage { language, text } => {
                let mut out = Vec::with_capacity(4 + language.len() + text.len());
                out.extend_from_slice(&(language.len() as u16).to_be_bytes());
                out.extend_from_slice(language);
                out.extend_from_slice(&(text.len() as u16).to_be_bytes());
                out.extend_from_slice(text);
                out
            }
            Payload::Text(bytes) | Payload::Octets(bytes) => bytes.clone(),
        }
    }

    /// Length of [`Value::encode`]'s output.
    pub fn encoded_len(&self) -> usize {
        match &self.payload {
            Payload::Empty => 0,
            Payload::Integer(_) => 4,
            Payload::Boolean(_) => 1,
            Payload::Range { .. } => 8,
            Payload::Resolution { .. } => 9,
            Payload::DateTime(_) => 11,
            Payload::WithLanguage { language, text } => 4 + language.len() + text.len(),
            Payload::Text(bytes) | Payload::Octets(bytes) => bytes.len(),
        }
    }

    /// Replace the payload with freshly decoded `bytes`, keeping the tag.
    /// On error the value is left untouched.
    pub fn set_packed(&mut self, bytes: &[u8]) -> Result<()> {
        let replacement = Self::decode(self.tag, bytes)?;
        self.payload = replacement.payload;
        Ok(())
    }

    pub fn tag(&self) -> ValueTag {
        self.tag
    }

    // -- literals --

    pub fn integer(v: i32) -> Self {
        Self {
            tag: ValueTag::INTEGER,
            payload: Payload::Integer(v),
        }
    }

    pub fn enumeration(v: i32) -> Self {
        Self {
            tag: ValueTag::ENUM,
            payload: Payload::Integer(v),
        }
    }

    pub fn boolean(v: bool) -> Self {
        Self {
            tag: ValueTag::BOOLEAN,
            payload: Payload::Boolean(v),
        }
    }

    pub fn range(lower: i32, upper: i32) -> Self {
        Self {
            tag: ValueTag::RANGE_OF_INTEGER,
            payload: Payload::Range { lower, upper },
        }
    }

    pub fn resolution(cross_feed: i32, feed: i32, units: i8) -> Self {
        Self {
            tag: ValueTag::RESOLUTION,
            payload: Payload::Resolution {
                cross_feed,
                feed,
                units,
            },
        }
    }

    pub fn date_time(record: DateTimeRecord) -> Self {
        Self {
            tag: ValueTag::DATE_TIME,
            payload: Payload::DateTime(record),
        }
    }

    /// A character-string value (`text`, `name`, `keyword`, `uri`, ...).
    pub fn string(tag: ValueTag, s: &str) -> Self {
        Self {
            tag,
            payload: Payload::Text(s.as_bytes().to_vec()),
        }
    }

    pub fn keyword(s: &str) -> Self {
        Self::string(ValueTag::KEYWORD, s)
    }

    pub fn text(s: &str) -> Self {
        Self::string(ValueTag::TEXT, s)
    }

    pub fn name(s: &str) -> Self {
        Self::string(ValueTag::NAME, s)
    }

    pub fn uri(s: &str) -> Self {
        Self::string(ValueTag::URI, s)
    }

    pub fn charset(s: &str) -> Self {
        Self::string(ValueTag::CHARSET, s)
    }

    pub fn natural_language(s: &str) -> Self {
        Self::string(ValueTag::NATURAL_LANGUAGE, s)
    }

    pub fn mime_media_type(s: &str) -> Self {
        Self::string(ValueTag::MIME_MEDIA_TYPE, s)
    }

    /// `textWithLanguage` or `nameWithLanguage`.
    pub fn with_language(tag: ValueTag, language: &str, text: &str) -> Self {
        Self {
            tag,
            payload: Payload::WithLanguage {
                language: language.as_bytes().to_vec(),
                text: text.as_bytes().to_vec(),
            },
        }
    }

    pub fn octets(bytes: Vec<u8>) -> Self {
        Self {
            tag: ValueTag::OCTET_STRING,
            payload: Payload::Octets(bytes),
        }
    }

    /// An out-of-band value such as `unknown` or `no-value`.
    pub fn out_of_band(tag: ValueTag) -> Self {
        debug_assert!(tag.is_out_of_band());
        Self {
            tag,
            payload: Payload::Empty,
        }
    }

    // -- accessors --

    pub fn as_integer(&self) -> Option<i32> {
        match self.payload {
            Payload::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.payload {
            Payload::Boolean(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<(i32, i32)> {
        match self.payload {
            Payload::Range { lower, upper } => Some((lower, upper)),
            _ => None,
        }
    }

    pub fn as_resolution(&self) -> Option<(i32, i32, i8)> {
        match self.payload {
            Payload::Resolution {
                cross_feed,
                feed,
                units,
            } => Some((cross_feed, feed, units)),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<DateTimeRecord> {
        match self.payload {
            Payload::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// The string of a character-string or language-tagged value, if it is
    /// valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(bytes) | Payload::WithLanguage { text: bytes, .. } => {
                std::str::from_utf8(bytes).ok()
            }
            _ => None,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match &self.payload {
            Payload::WithLanguage { language, .. } => std::str::from_utf8(language).ok(),
            _ => None,
        }
    }

    pub fn as_octets(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Octets(bytes) | Payload::Text(bytes) => Some(bytes),
            _ => None,
        }
    }
}

fn decode_with_language(bytes: &[u8]) -> Result<Payload> {
    let truncated = || SpielwerkError::MalformedValue("truncated language-tagged string".into());

    let lang_len = bytes
        .get(0..2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]) as usize)
        .ok_or_else(truncated)?;
    let language = bytes.get(2..2 + lang_len).ok_or_else(truncated)?;
    let rest = &bytes[2 + lang_len..];
    let text_len = rest
        .get(0..2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]) as usize)
        .ok_or_else(truncated)?;
    if rest.len() != 2 + text_len {
        return Err(SpielwerkError::MalformedValue(format!(
            "language-tagged string declares {text_len} text bytes, has {}",
            rest.len().saturating_sub(2)
        )));
    }
    Ok(Payload::WithLanguage {
        language: language.to_vec(),
        text: rest[2..].to_vec(),
    })
}
