// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spielwerk IPP: the RFC 2910 binary encoding.  Values are decoded and
// validated per value tag, attributes carry 1setOf framing, groups collapse
// duplicate names, and messages wrap it all with the fixed header and the
// trailing document data.

pub mod attribute;
pub mod constants;
pub mod group;
pub mod message;
pub mod status;
pub mod value;

pub use attribute::Attribute;
pub use constants::{GroupTag, Operation, StatusCode, ValueFamily, ValueTag};
pub use group::AttributeGroup;
pub use message::{IppVersion, Message};
pub use status::IppError;
pub use value::{DateTimeRecord, Value};
