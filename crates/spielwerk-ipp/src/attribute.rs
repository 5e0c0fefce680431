// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Named, non-empty sequences of values with 1setOf framing.

use spielwerk_core::error::{Result, SpielwerkError};

use crate::constants::{ValueFamily, ValueTag};
use crate::value::{MAX_VALUE_LEN, Value};

/// An IPP attribute: a name and one or more values of the same family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    values: Vec<Value>,
}

impl Attribute {
    /// Build an attribute, rejecting empty value lists, unusable names,
    /// oversized values and values from more than one tag family.
    /// Out-of-band values may accompany any family.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.len() > MAX_VALUE_LEN {
            return Err(SpielwerkError::InvalidAttributeName(name));
        }
        if values.is_empty() {
            return Err(SpielwerkError::EmptyAttribute(name));
        }
        if let Some(v) = values.iter().find(|v| v.encoded_len() > MAX_VALUE_LEN) {
            return Err(SpielwerkError::MalformedValue(format!(
                "{name}: {} byte value does not fit a value-length field",
                v.encoded_len()
            )));
        }

        let mut family: Option<ValueFamily> = None;
        for v in values.iter().filter(|v| !v.tag().is_out_of_band()) {
            let f = v.tag().family();
            match family {
                None => family = Some(f),
                Some(seen) if seen != f => {
                    return Err(SpielwerkError::MixedValueFamilies(name));
                }
                Some(_) => {}
            }
        }

        Ok(Self { name, values })
    }

    pub fn single(name: impl Into<String>, value: Value) -> Result<Self> {
        Self::new(name, vec![value])
    }

    // -- typed constructors --

    pub fn keyword(name: &str, value: &str) -> Result<Self> {
        Self::single(name, Value::keyword(value))
    }

    pub fn keywords<'a>(name: &str, values: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        Self::new(name, values.into_iter().map(Value::keyword).collect())
    }

    pub fn integer(name: &str, value: i32) -> Result<Self> {
        Self::single(name, Value::integer(value))
    }

    pub fn enumeration(name: &str, value: i32) -> Result<Self> {
        Self::single(name, Value::enumeration(value))
    }

    pub fn enumerations(name: &str, values: impl IntoIterator<Item = i32>) -> Result<Self> {
        Self::new(name, values.into_iter().map(Value::enumeration).collect())
    }

    pub fn boolean(name: &str, value: bool) -> Result<Self> {
        Self::single(name, Value::boolean(value))
    }

    pub fn uri(name: &str, value: &str) -> Result<Self> {
        Self::single(name, Value::uri(value))
    }

    pub fn uris<'a>(name: &str, values: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        Self::new(name, values.into_iter().map(Value::uri).collect())
    }

    pub fn charset(name: &str, value: &str) -> Result<Self> {
        Self::single(name, Value::charset(value))
    }

    pub fn natural_language(name: &str, value: &str) -> Result<Self> {
        Self::single(name, Value::natural_language(value))
    }

    pub fn name(name: &str, value: &str) -> Result<Self> {
        Self::single(name, Value::name(value))
    }

    pub fn text(name: &str, value: &str) -> Result<Self> {
        Self::single(name, Value::text(value))
    }

    pub fn mime_media_type(name: &str, value: &str) -> Result<Self> {
        Self::single(name, Value::mime_media_type(value))
    }

    pub fn mime_media_types<'a>(
        name: &str,
        values: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        Self::new(name, values.into_iter().map(Value::mime_media_type).collect())
    }

    pub fn out_of_band(name: &str, tag: ValueTag) -> Result<Self> {
        Self::single(name, Value::out_of_band(tag))
    }

    // -- accessors --

    pub fn name_str(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The first value; attributes are never empty.
    pub fn first(&self) -> &Value {
        &self.values[0]
    }

    /// Append the wire form to `buf`.
    pub fn pack_into(&self, buf: &mut Vec<u8>) {
        for (i, value) in self.values.iter().enumerate() {
            buf.push(value.tag().code());
            if i == 0 {
                buf.extend_from_slice(&(self.name.len() as u16).to_be_bytes());
                buf.extend_from_slice(self.name.as_bytes());
            } else {
                // additional value of a 1setOf
                buf.extend_from_slice(&0u16.to_be_bytes());
            }
            buf.extend_from_slice(&(value.encoded_len() as u16).to_be_bytes());
            buf.extend_from_slice(&value.encode());
        }
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.pack_into(&mut buf);
        buf
    }
}
