// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP request/response messages (RFC 2910 §3.1).
//
// ```text
// version-number:   2 bytes (major, minor)
// operation-id / status-code: 2 bytes
// request-id:       4 bytes
// attribute-groups: { group-tag { value-tag name-len name value-len value }* }*
// end-of-attributes-tag: 0x03
// data:             remainder, opaque
// ```

use std::fmt;

use tracing::trace;

use spielwerk_core::error::{Result, SpielwerkError};

use crate::attribute::Attribute;
use crate::constants::{GroupTag, StatusCode, ValueTag};
use crate::group::AttributeGroup;
use crate::value::Value;

/// Size of the fixed message header.
pub const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IppVersion {
    pub major: u8,
    pub minor: u8,
}

impl IppVersion {
    pub const V1_0: Self = Self { major: 1, minor: 0 };
    pub const V1_1: Self = Self { major: 1, minor: 1 };
}

impl fmt::Display for IppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A request or response.  `code` is the operation id for requests and the
/// status code for responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub version: IppVersion,
    pub code: u16,
    pub request_id: u32,
    groups: Vec<AttributeGroup>,
    data: Vec<u8>,
}

/// Cursor over the undecoded part of a message body.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                SpielwerkError::BadRequest(format!("truncated {what} at offset {}", self.pos))
            })?;
        let buf: &'a [u8] = self.buf;
        let slice = &buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &str) -> Result<u16> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }
}

/// An attribute whose values are still being collected.
struct PendingAttribute {
    name: String,
    values: Vec<Value>,
}

impl PendingAttribute {
    fn flush_into(self, group: &mut AttributeGroup) -> Result<()> {
        let attr = Attribute::new(self.name, self.values)
            .map_err(|e| SpielwerkError::BadRequest(e.to_string()))?;
        group.set(attr);
        Ok(())
    }
}

impl Message {
    pub fn new(version: IppVersion, code: u16, request_id: u32) -> Self {
        Self {
            version,
            code,
            request_id,
            groups: Vec::new(),
            data: Vec::new(),
        }
    }

    /// A response carrying the mandatory `attributes-charset` and
    /// `attributes-natural-language` operation attributes.
    pub fn response(version: IppVersion, status: StatusCode, request_id: u32) -> Result<Self> {
        let mut msg = Self::new(version, status.code(), request_id);
        let mut op = AttributeGroup::new(GroupTag::Operation);
        op.set(Attribute::charset("attributes-charset", "utf-8")?);
        op.set(Attribute::natural_language(
            "attributes-natural-language",
            "en-us",
        )?);
        msg.push_group(op);
        Ok(msg)
    }

    /// Decode a message whose first `content_length` bytes of `body` are the
    /// IPP payload.  Whatever follows the end tag up to `content_length` is
    /// kept as document data.
    pub fn decode(body: &[u8], content_length: usize) -> Result<Self> {
        if content_length > body.len() {
            return Err(SpielwerkError::BadRequest(format!(
                "content length {content_length} exceeds the {} bytes received",
                body.len()
            )));
        }
        let mut r = Reader {
            buf: &body[..content_length],
            pos: 0,
        };

        let header = r.take(HEADER_LEN, "message header")?;
        let version = IppVersion {
            major: header[0],
            minor: header[1],
        };
        let code = u16::from_be_bytes([header[2], header[3]]);
        let request_id = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);

        let mut groups = Vec::new();
        let mut current: Option<AttributeGroup> = None;
        let mut pending: Option<PendingAttribute> = None;
        let mut saw_end = false;

        while r.pos < r.buf.len() {
            let tag = r.u8("tag")?;

            if GroupTag::is_delimiter(tag) {
                if let Some(mut group) = current.take() {
                    if let Some(attr) = pending.take() {
                        attr.flush_into(&mut group)?;
                    }
                    groups.push(group);
                }
                match GroupTag::try_from(tag) {
                    Ok(GroupTag::End) => {
                        saw_end = true;
                        break;
                    }
                    Ok(group_tag) => current = Some(AttributeGroup::new(group_tag)),
                    Err(unknown) => {
                        return Err(SpielwerkError::BadRequest(format!(
                            "unknown group tag 0x{unknown:02x}"
                        )));
                    }
                }
                continue;
            }

            let Some(group) = current.as_mut() else {
                return Err(SpielwerkError::BadRequest(
                    "attribute outside of any group".into(),
                ));
            };

            let name_len = r.u16("name-length")? as usize;
            let name_bytes = r.take(name_len, "attribute name")?;
            let value_len = r.u16("value-length")? as usize;
            let value_bytes = r.take(value_len, "attribute value")?;

            let value = Value::decode(ValueTag::from_byte(tag), value_bytes)
                .map_err(|e| SpielwerkError::BadRequest(e.to_string()))?;

            if name_len == 0 {
                match pending.as_mut() {
                    Some(attr) => attr.values.push(value),
                    None => {
                        return Err(SpielwerkError::BadRequest(
                            "additional value without a preceding attribute".into(),
                        ));
                    }
                }
            } else {
                let name = String::from_utf8(name_bytes.to_vec()).map_err(|_| {
                    SpielwerkError::BadRequest("attribute name is not UTF-8".into())
                })?;
                if let Some(attr) = pending.take() {
                    attr.flush_into(group)?;
                }
                pending = Some(PendingAttribute {
                    name,
                    values: vec![value],
                });
            }
        }

        if !saw_end {
            return Err(SpielwerkError::BadRequest(
                "missing end-of-attributes tag".into(),
            ));
        }

        let data = r.buf[r.pos..].to_vec();
        trace!(
            code,
            request_id,
            groups = groups.len(),
            data_len = data.len(),
            "decoded IPP message"
        );

        Ok(Self {
            version,
            code,
            request_id,
            groups,
            data,
        })
    }

    /// Decode a complete body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        Self::decode(body, body.len())
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256 + self.data.len());
        buf.push(self.version.major);
        buf.push(self.version.minor);
        buf.extend_from_slice(&self.code.to_be_bytes());
        buf.extend_from_slice(&self.request_id.to_be_bytes());
        for group in &self.groups {
            debug_assert!(group.tag() != GroupTag::End, "end tag used as a group");
            group.pack_into(&mut buf);
        }
        buf.push(GroupTag::End.code());
        buf.extend_from_slice(&self.data);
        buf
    }

    // -- groups --

    pub fn groups(&self) -> &[AttributeGroup] {
        &self.groups
    }

    pub fn push_group(&mut self, group: AttributeGroup) {
        self.groups.push(group);
    }

    /// First group with `tag`.
    pub fn group(&self, tag: GroupTag) -> Option<&AttributeGroup> {
        self.groups.iter().find(|g| g.tag() == tag)
    }

    pub fn group_mut(&mut self, tag: GroupTag) -> Option<&mut AttributeGroup> {
        self.groups.iter_mut().find(|g| g.tag() == tag)
    }

    pub fn operation_attributes(&self) -> Option<&AttributeGroup> {
        self.group(GroupTag::Operation)
    }

    /// The operation group, created if missing.
    pub fn operation_attributes_mut(&mut self) -> &mut AttributeGroup {
        let idx = match self.groups.iter().position(|g| g.tag() == GroupTag::Operation) {
            Some(idx) => idx,
            None => {
                self.groups.insert(0, AttributeGroup::new(GroupTag::Operation));
                0
            }
        };
        &mut self.groups[idx]
    }

    // -- data --

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    pub fn take_data(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_attr(buf: &mut Vec<u8>, tag: u8, name: &str, value: &[u8]) {
        buf.push(tag);
        buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
        buf.extend_from_slice(value);
    }

    fn print_job_bytes(document: &[u8]) -> Vec<u8> {
        let mut buf = vec![0x01, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x2a];
        buf.push(0x01);
        write_attr(&mut buf, 0x47, "attributes-charset", b"utf-8");
        write_attr(&mut buf, 0x48, "attributes-natural-language", b"en-us");
        write_attr(&mut buf, 0x45, "printer-uri", b"ipp://localhost/printers/jukebox");
        buf.push(0x02);
        write_attr(&mut buf, 0x42, "job-name", b"side a");
        buf.push(0x03);
        buf.extend_from_slice(document);
        buf
    }

    #[test]
    fn parse_print_job_request() {
        let msg = Message::parse(&print_job_bytes(b"ID3")).expect("parse");
        assert_eq!(msg.version, IppVersion::V1_1);
        assert_eq!(msg.code, 0x0002);
        assert_eq!(msg.request_id, 42);
        assert_eq!(msg.groups().len(), 2);
        let op = msg.operation_attributes().expect("operation group");
        assert_eq!(op.get_str("attributes-charset").expect("charset"), "utf-8");
        let job = msg.group(GroupTag::Job).expect("job group");
        assert_eq!(job.get_str("job-name").expect("job-name"), "side a");
        assert_eq!(msg.data(), b"ID3");
    }

    #[test]
    fn round_trip_is_byte_identical() {
        let bytes = print_job_bytes(b"\x00\x01\x02");
        let msg = Message::parse(&bytes).expect("parse");
        assert_eq!(msg.pack(), bytes);
    }

    #[test]
    fn additional_values_join_previous_attribute() {
        let mut buf = vec![0x01, 0x01, 0x00, 0x0b, 0, 0, 0, 1, 0x01];
        write_attr(&mut buf, 0x44, "requested-attributes", b"printer-name");
        write_attr(&mut buf, 0x44, "", b"printer-state");
        buf.push(0x03);
        let msg = Message::parse(&buf).expect("parse");
        let op = msg.operation_attributes().expect("op");
        let attr = op.get("requested-attributes").expect("attr");
        let values: Vec<_> = attr.values().iter().filter_map(Value::as_str).collect();
        assert_eq!(values, ["printer-name", "printer-state"]);
        assert_eq!(msg.pack(), buf);
    }

    #[test]
    fn duplicate_names_in_a_group_collapse() {
        let mut buf = vec![0x01, 0x01, 0x00, 0x02, 0, 0, 0, 1, 0x02];
        write_attr(&mut buf, 0x42, "job-name", b"a");
        write_attr(&mut buf, 0x42, "job-name", b"b");
        buf.push(0x03);
        let msg = Message::parse(&buf).expect("parse");
        let job = msg.group(GroupTag::Job).expect("job group");
        assert_eq!(job.len(), 1);
        assert_eq!(job.get_str("job-name").expect("job-name"), "b");
    }

    #[test]
    fn value_length_past_buffer_is_bad_request() {
        let mut buf = vec![0x01, 0x01, 0x00, 0x0b, 0, 0, 0, 1, 0x01];
        buf.push(0x47);
        buf.extend_from_slice(&[0x00, 0x01, b'x']);
        buf.extend_from_slice(&[0x00, 0x40]);
        buf.extend_from_slice(b"short");
        assert!(matches!(
            Message::parse(&buf),
            Err(SpielwerkError::BadRequest(_))
        ));

        // the next request parses normally
        Message::parse(&print_job_bytes(b"")).expect("following request");
    }

    #[test]
    fn short_header_is_bad_request() {
        assert!(matches!(
            Message::parse(&[0x01, 0x01, 0x00]),
            Err(SpielwerkError::BadRequest(_))
        ));
    }

    #[test]
    fn missing_end_tag_is_bad_request() {
        let mut buf = vec![0x01, 0x01, 0x00, 0x0b, 0, 0, 0, 1, 0x01];
        write_attr(&mut buf, 0x47, "attributes-charset", b"utf-8");
        assert!(Message::parse(&buf).is_err());
    }

    #[test]
    fn unknown_group_tag_is_bad_request() {
        let buf = vec![0x01, 0x01, 0x00, 0x0b, 0, 0, 0, 1, 0x09, 0x03];
        assert!(Message::parse(&buf).is_err());
    }

    #[test]
    fn attribute_before_group_is_bad_request() {
        let mut buf = vec![0x01, 0x01, 0x00, 0x0b, 0, 0, 0, 1];
        write_attr(&mut buf, 0x47, "attributes-charset", b"utf-8");
        buf.push(0x03);
        assert!(Message::parse(&buf).is_err());
    }

    #[test]
    fn leading_additional_value_is_bad_request() {
        let mut buf = vec![0x01, 0x01, 0x00, 0x0b, 0, 0, 0, 1, 0x01];
        write_attr(&mut buf, 0x44, "", b"orphan");
        buf.push(0x03);
        assert!(Message::parse(&buf).is_err());
    }

    #[test]
    fn malformed_integer_is_bad_request() {
        let mut buf = vec![0x01, 0x01, 0x00, 0x08, 0, 0, 0, 1, 0x01];
        write_attr(&mut buf, 0x21, "job-id", &[0, 1]);
        buf.push(0x03);
        assert!(matches!(
            Message::parse(&buf),
            Err(SpielwerkError::BadRequest(_))
        ));
    }

    #[test]
    fn content_length_bounds_document_data() {
        let mut bytes = print_job_bytes(b"abcdef");
        let content_length = bytes.len() - 3;
        bytes.extend_from_slice(b"next-request");
        let msg = Message::decode(&bytes, content_length).expect("decode");
        assert_eq!(msg.data(), b"abc");
        assert!(Message::decode(&bytes, bytes.len() + 1).is_err());
    }

    #[test]
    fn response_has_charset_preamble() {
        let msg = Message::response(IppVersion::V1_1, StatusCode::SuccessfulOk, 9).expect("response");
        let bytes = msg.pack();
        assert_eq!(&bytes[..8], &[0x01, 0x01, 0x00, 0x00, 0, 0, 0, 9]);
        assert_eq!(*bytes.last().expect("end tag"), 0x03);
        let back = Message::parse(&bytes).expect("parse response");
        let op = back.operation_attributes().expect("op");
        assert_eq!(
            op.get_str("attributes-natural-language").expect("lang"),
            "en-us"
        );
    }

    #[test]
    fn operation_attributes_mut_creates_group_first() {
        let mut msg = Message::new(IppVersion::V1_0, 0, 1);
        msg.push_group(AttributeGroup::new(GroupTag::Printer));
        msg.operation_attributes_mut()
            .set(Attribute::text("status-message", "hi").expect("attr"));
        assert_eq!(msg.groups()[0].tag(), GroupTag::Operation);
    }
}
