// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP-level errors: a status code, a human-readable message, and the
// attributes that caused a client-error-attributes rejection.

use thiserror::Error;

use spielwerk_core::error::SpielwerkError;

use crate::attribute::Attribute;
use crate::constants::{GroupTag, StatusCode};
use crate::group::AttributeGroup;
use crate::message::{IppVersion, Message};

#[derive(Debug, Error)]
#[error("{status}: {message}")]
pub struct IppError {
    pub status: StatusCode,
    pub message: String,
    /// Echoed back in an unsupported-attributes group.
    pub unsupported: Vec<Attribute>,
}

impl IppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            unsupported: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::ClientErrorBadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::ClientErrorNotFound, message)
    }

    pub fn not_possible(message: impl Into<String>) -> Self {
        Self::new(StatusCode::ClientErrorNotPossible, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::ServerErrorInternalError, message)
    }

    /// `client-error-attributes-or-values-not-supported` naming `attributes`.
    pub fn attributes(message: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            status: StatusCode::ClientErrorAttributesOrValuesNotSupported,
            message: message.into(),
            unsupported: attributes,
        }
    }

    /// Build the error response for a request with `version`/`request_id`.
    pub fn to_response(&self, version: IppVersion, request_id: u32) -> Message {
        let mut msg = match Message::response(version, self.status, request_id) {
            Ok(msg) => msg,
            Err(_) => Message::new(version, self.status.code(), request_id),
        };
        if let Ok(attr) = Attribute::text("status-message", &self.message) {
            msg.operation_attributes_mut().set(attr);
        }
        if !self.unsupported.is_empty() {
            msg.push_group(AttributeGroup::with_attributes(
                GroupTag::Unsupported,
                self.unsupported.clone(),
            ));
        }
        msg
    }
}

impl From<SpielwerkError> for IppError {
    fn from(err: SpielwerkError) -> Self {
        let status = match &err {
            SpielwerkError::BadRequest(_)
            | SpielwerkError::MalformedValue(_)
            | SpielwerkError::AttributeNotFound(_)
            | SpielwerkError::EmptyAttribute(_)
            | SpielwerkError::InvalidAttributeName(_)
            | SpielwerkError::MixedValueFamilies(_) => StatusCode::ClientErrorBadRequest,
            SpielwerkError::InvalidJob(_) | SpielwerkError::UnknownPrinter(_) => {
                StatusCode::ClientErrorNotFound
            }
            SpielwerkError::InvalidJobState { .. } | SpielwerkError::MissingDocument(_) => {
                StatusCode::ClientErrorNotPossible
            }
            SpielwerkError::Playback(_) => StatusCode::ServerErrorDeviceError,
            SpielwerkError::InvalidPrinterState { .. } => StatusCode::ServerErrorServiceUnavailable,
            SpielwerkError::Interrupted
            | SpielwerkError::Config(_)
            | SpielwerkError::PrintServer(_)
            | SpielwerkError::Io(_)
            | SpielwerkError::Serialization(_) => StatusCode::ServerErrorInternalError,
        };
        Self::new(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spielwerk_core::types::{JobId, JobState};

    #[test]
    fn internal_errors_map_to_status_codes() {
        let cases = [
            (SpielwerkError::BadRequest("x".into()), 0x0400),
            (SpielwerkError::InvalidJob(JobId::new(3)), 0x0406),
            (
                SpielwerkError::InvalidJobState {
                    id: JobId::new(3),
                    state: JobState::Completed,
                    action: "cancel",
                },
                0x0404,
            ),
            (SpielwerkError::Playback("no such file".into()), 0x0504),
            (SpielwerkError::Interrupted, 0x0500),
        ];
        for (err, code) in cases {
            assert_eq!(IppError::from(err).status.code(), code);
        }
    }

    #[test]
    fn attribute_error_response_has_unsupported_group() {
        let bad = Attribute::natural_language("attributes-natural-language", "fr").expect("attr");
        let err = IppError::attributes("unsupported natural language", vec![bad]);
        let msg = err.to_response(IppVersion::V1_1, 5);
        assert_eq!(msg.code, 0x040b);
        assert_eq!(msg.request_id, 5);
        let unsupported = msg.group(GroupTag::Unsupported).expect("unsupported group");
        assert!(unsupported.contains("attributes-natural-language"));
        let op = msg.operation_attributes().expect("op");
        assert_eq!(
            op.get_str("status-message").expect("status-message"),
            "unsupported natural language"
        );
    }

    #[test]
    fn plain_error_response_has_no_unsupported_group() {
        let msg = IppError::not_found("no job 9").to_response(IppVersion::V1_0, 1);
        assert_eq!(msg.code, 0x0406);
        assert!(msg.group(GroupTag::Unsupported).is_none());
        assert_eq!(msg.version, IppVersion::V1_0);
    }
}
