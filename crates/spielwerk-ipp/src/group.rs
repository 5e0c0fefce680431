// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tagged, ordered attribute groups.

use spielwerk_core::error::{Result, SpielwerkError};

use crate::attribute::Attribute;
use crate::constants::GroupTag;

/// An ordered name→attribute mapping under one delimiter tag.  Setting a
/// name that already exists removes the old entry and appends the new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeGroup {
    /// Delimiter tag written before the group's attributes.
    tag: GroupTag,
    /// Attributes in wire order; names are unique.
    attributes: Vec<Attribute>,
}

impl AttributeGroup {
    /// An empty group.
    pub fn new(tag: GroupTag) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
        }
    }

    /// A group holding `attributes`, later duplicates replacing earlier ones.
    pub fn with_attributes(tag: GroupTag, attributes: Vec<Attribute>) -> Self {
        let mut group = Self::new(tag);
        for attr in attributes {
            group.set(attr);
        }
        group
    }

    pub fn tag(&self) -> GroupTag {
        self.tag
    }

    /// Add `attr`, replacing any attribute of the same name.
    pub fn set(&mut self, attr: Attribute) {
        self.attributes.retain(|a| a.name_str() != attr.name_str());
        self.attributes.push(attr);
    }

    /// The attribute called `name`, or [`SpielwerkError::AttributeNotFound`].
    pub fn get(&self, name: &str) -> Result<&Attribute> {
        self.find(name)
            .ok_or_else(|| SpielwerkError::AttributeNotFound(name.to_string()))
    }

    /// Like [`AttributeGroup::get`] without the error.
    pub fn find(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name_str() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Take the attribute called `name` out of the group.
    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        let idx = self.attributes.iter().position(|a| a.name_str() == name)?;
        Some(self.attributes.remove(idx))
    }

    /// First value of `name` as a string.
    pub fn get_str(&self, name: &str) -> Result<&str> {
        self.get(name)?.first().as_str().ok_or_else(|| {
            SpielwerkError::BadRequest(format!("{name} is not a character string"))
        })
    }

    /// First value of `name` as an integer or enum.
    pub fn get_integer(&self, name: &str) -> Result<i32> {
        self.get(name)?
            .first()
            .as_integer()
            .ok_or_else(|| SpielwerkError::BadRequest(format!("{name} is not an integer")))
    }

    /// First value of `name` as a boolean.
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.get(name)?
            .first()
            .as_bool()
            .ok_or_else(|| SpielwerkError::BadRequest(format!("{name} is not a boolean")))
    }

    /// Attributes in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Append the delimiter tag and every attribute to `buf`.
    pub fn pack_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.tag.code());
        for attr in &self.attributes {
            attr.pack_into(buf);
        }
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.pack_into(&mut buf);
        buf
    }
}
