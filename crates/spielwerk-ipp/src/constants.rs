// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Numeric constants of the IPP wire format (RFC 2910 §3.5, RFC 2911 §4 and
// the CUPS extensions).

use std::fmt;

// ---------------------------------------------------------------------------
// Delimiter tags (RFC 2910 §3.5.1)
// ---------------------------------------------------------------------------

/// Attribute group delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupTag {
    Operation,
    Job,
    /// end-of-attributes-tag; never the tag of a real group.
    End,
    Printer,
    Unsupported,
    Subscription,
    EventNotification,
}

impl GroupTag {
    pub const fn code(self) -> u8 {
        match self {
            Self::Operation => 0x01,
            Self::Job => 0x02,
            Self::End => 0x03,
            Self::Printer => 0x04,
            Self::Unsupported => 0x05,
            Self::Subscription => 0x06,
            Self::EventNotification => 0x07,
        }
    }

    /// Delimiter tags occupy 0x00..=0x0f; anything higher is a value tag.
    pub const fn is_delimiter(byte: u8) -> bool {
        byte <= 0x0f
    }
}

impl TryFrom<u8> for GroupTag {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        Ok(match byte {
            0x01 => Self::Operation,
            0x02 => Self::Job,
            0x03 => Self::End,
            0x04 => Self::Printer,
            0x05 => Self::Unsupported,
            0x06 => Self::Subscription,
            0x07 => Self::EventNotification,
            other => return Err(other),
        })
    }
}

// ---------------------------------------------------------------------------
// Value tags (RFC 2910 §3.5.2)
// ---------------------------------------------------------------------------

/// A value tag byte.  Unknown tags are kept as-is so that their values can
/// be carried through opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueTag(u8);

impl ValueTag {
    // out-of-band
    pub const UNSUPPORTED: Self = Self(0x10);
    pub const DEFAULT: Self = Self(0x11);
    pub const UNKNOWN: Self = Self(0x12);
    pub const NO_VALUE: Self = Self(0x13);
    pub const NOT_SETTABLE: Self = Self(0x15);
    pub const DELETE_ATTRIBUTE: Self = Self(0x16);
    pub const ADMIN_DEFINE: Self = Self(0x17);

    // integer family
    pub const INTEGER: Self = Self(0x21);
    pub const BOOLEAN: Self = Self(0x22);
    pub const ENUM: Self = Self(0x23);

    // octet-string family
    pub const OCTET_STRING: Self = Self(0x30);
    pub const DATE_TIME: Self = Self(0x31);
    pub const RESOLUTION: Self = Self(0x32);
    pub const RANGE_OF_INTEGER: Self = Self(0x33);
    pub const BEG_COLLECTION: Self = Self(0x34);
    pub const TEXT_WITH_LANGUAGE: Self = Self(0x35);
    pub const NAME_WITH_LANGUAGE: Self = Self(0x36);
    pub const END_COLLECTION: Self = Self(0x37);

    // character-string family
    pub const TEXT: Self = Self(0x41);
    pub const NAME: Self = Self(0x42);
    pub const KEYWORD: Self = Self(0x44);
    pub const URI: Self = Self(0x45);
    pub const URI_SCHEME: Self = Self(0x46);
    pub const CHARSET: Self = Self(0x47);
    pub const NATURAL_LANGUAGE: Self = Self(0x48);
    pub const MIME_MEDIA_TYPE: Self = Self(0x49);
    pub const MEMBER_ATTR_NAME: Self = Self(0x4a);

    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    pub const fn code(self) -> u8 {
        self.0
    }

    pub const fn family(self) -> ValueFamily {
        match self.0 {
            0x10..=0x1f => ValueFamily::OutOfBand,
            0x20..=0x2f => ValueFamily::Integer,
            // Language-tagged strings sit in the octet range but mix freely
            // with plain text and name values.
            0x35 | 0x36 => ValueFamily::Character,
            0x30..=0x3f => ValueFamily::Octet,
            0x40..=0x5f => ValueFamily::Character,
            _ => ValueFamily::Unknown,
        }
    }

    pub const fn is_out_of_band(self) -> bool {
        matches!(self.family(), ValueFamily::OutOfBand)
    }

    /// Byte width required by fixed-width tags; `None` for variable width.
    pub const fn fixed_width(self) -> Option<usize> {
        match self.0 {
            0x10..=0x1f => Some(0),
            0x21 | 0x23 => Some(4),
            0x22 => Some(1),
            0x31 => Some(11),
            0x32 => Some(9),
            0x33 => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Tag families; all values of one attribute must share a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFamily {
    OutOfBand,
    Integer,
    Octet,
    Character,
    Unknown,
}

// ---------------------------------------------------------------------------
// Operation ids (RFC 2911 §4.4.15, CUPS IPP extensions)
// ---------------------------------------------------------------------------

/// Operations the server recognises.  Ids outside this set are answered with
/// `server-error-operation-not-supported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    PrintJob,
    PrintUri,
    ValidateJob,
    CreateJob,
    SendDocument,
    SendUri,
    CancelJob,
    GetJobAttributes,
    GetJobs,
    GetPrinterAttributes,
    HoldJob,
    ReleaseJob,
    RestartJob,
    PausePrinter,
    ResumePrinter,
    PurgeJobs,
    SetPrinterAttributes,
    SetJobAttributes,
    PromoteJob,
    CupsGetDefault,
    CupsGetPrinters,
    CupsGetClasses,
    CupsGetDocument,
}

impl Operation {
    pub const fn code(self) -> u16 {
        match self {
            Self::PrintJob => 0x0002,
            Self::PrintUri => 0x0003,
            Self::ValidateJob => 0x0004,
            Self::CreateJob => 0x0005,
            Self::SendDocument => 0x0006,
            Self::SendUri => 0x0007,
            Self::CancelJob => 0x0008,
            Self::GetJobAttributes => 0x0009,
            Self::GetJobs => 0x000a,
            Self::GetPrinterAttributes => 0x000b,
            Self::HoldJob => 0x000c,
            Self::ReleaseJob => 0x000d,
            Self::RestartJob => 0x000e,
            Self::PausePrinter => 0x0010,
            Self::ResumePrinter => 0x0011,
            Self::PurgeJobs => 0x0012,
            Self::SetPrinterAttributes => 0x0013,
            Self::SetJobAttributes => 0x0014,
            Self::PromoteJob => 0x0030,
            Self::CupsGetDefault => 0x4001,
            Self::CupsGetPrinters => 0x4002,
            Self::CupsGetClasses => 0x4005,
            Self::CupsGetDocument => 0x4027,
        }
    }

    pub const ALL: [Self; 23] = [
        Self::PrintJob,
        Self::PrintUri,
        Self::ValidateJob,
        Self::CreateJob,
        Self::SendDocument,
        Self::SendUri,
        Self::CancelJob,
        Self::GetJobAttributes,
        Self::GetJobs,
        Self::GetPrinterAttributes,
        Self::HoldJob,
        Self::ReleaseJob,
        Self::RestartJob,
        Self::PausePrinter,
        Self::ResumePrinter,
        Self::PurgeJobs,
        Self::SetPrinterAttributes,
        Self::SetJobAttributes,
        Self::PromoteJob,
        Self::CupsGetDefault,
        Self::CupsGetPrinters,
        Self::CupsGetClasses,
        Self::CupsGetDocument,
    ];
}

impl TryFrom<u16> for Operation {
    type Error = u16;

    fn try_from(code: u16) -> Result<Self, u16> {
        Self::ALL
            .into_iter()
            .find(|op| op.code() == code)
            .ok_or(code)
    }
}

// ---------------------------------------------------------------------------
// Status codes (RFC 2911 §13.1)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    SuccessfulOk,
    SuccessfulOkIgnoredOrSubstitutedAttributes,
    SuccessfulOkConflictingAttributes,

    ClientErrorBadRequest,
    ClientErrorForbidden,
    ClientErrorNotAuthenticated,
    ClientErrorNotAuthorized,
    ClientErrorNotPossible,
    ClientErrorTimeout,
    ClientErrorNotFound,
    ClientErrorGone,
    ClientErrorRequestEntityTooLarge,
    ClientErrorRequestValueTooLong,
    ClientErrorDocumentFormatNotSupported,
    ClientErrorAttributesOrValuesNotSupported,
    ClientErrorUriSchemeNotSupported,
    ClientErrorCharsetNotSupported,
    ClientErrorConflictingAttributes,
    ClientErrorCompressionNotSupported,
    ClientErrorCompressionError,
    ClientErrorDocumentFormatError,
    ClientErrorDocumentAccessError,

    ServerErrorInternalError,
    ServerErrorOperationNotSupported,
    ServerErrorServiceUnavailable,
    ServerErrorVersionNotSupported,
    ServerErrorDeviceError,
    ServerErrorTemporaryError,
    ServerErrorNotAcceptingJobs,
    ServerErrorBusy,
    ServerErrorJobCanceled,
    ServerErrorMultipleDocumentJobsNotSupported,
}

impl StatusCode {
    pub const fn code(self) -> u16 {
        match self {
            Self::SuccessfulOk => 0x0000,
            Self::SuccessfulOkIgnoredOrSubstitutedAttributes => 0x0001,
            Self::SuccessfulOkConflictingAttributes => 0x0002,
            Self::ClientErrorBadRequest => 0x0400,
            Self::ClientErrorForbidden => 0x0401,
            Self::ClientErrorNotAuthenticated => 0x0402,
            Self::ClientErrorNotAuthorized => 0x0403,
            Self::ClientErrorNotPossible => 0x0404,
            Self::ClientErrorTimeout => 0x0405,
            Self::ClientErrorNotFound => 0x0406,
            Self::ClientErrorGone => 0x0407,
            Self::ClientErrorRequestEntityTooLarge => 0x0408,
            Self::ClientErrorRequestValueTooLong => 0x0409,
            Self::ClientErrorDocumentFormatNotSupported => 0x040a,
            Self::ClientErrorAttributesOrValuesNotSupported => 0x040b,
            Self::ClientErrorUriSchemeNotSupported => 0x040c,
            Self::ClientErrorCharsetNotSupported => 0x040d,
            Self::ClientErrorConflictingAttributes => 0x040e,
            Self::ClientErrorCompressionNotSupported => 0x040f,
            Self::ClientErrorCompressionError => 0x0410,
            Self::ClientErrorDocumentFormatError => 0x0411,
            Self::ClientErrorDocumentAccessError => 0x0412,
            Self::ServerErrorInternalError => 0x0500,
            Self::ServerErrorOperationNotSupported => 0x0501,
            Self::ServerErrorServiceUnavailable => 0x0502,
            Self::ServerErrorVersionNotSupported => 0x0503,
            Self::ServerErrorDeviceError => 0x0504,
            Self::ServerErrorTemporaryError => 0x0505,
            Self::ServerErrorNotAcceptingJobs => 0x0506,
            Self::ServerErrorBusy => 0x0507,
            Self::ServerErrorJobCanceled => 0x0508,
            Self::ServerErrorMultipleDocumentJobsNotSupported => 0x0509,
        }
    }

    pub const fn is_success(self) -> bool {
        self.code() < 0x0100
    }

    pub const fn keyword(self) -> &'static str {
        match self {
            Self::SuccessfulOk => "successful-ok",
            Self::SuccessfulOkIgnoredOrSubstitutedAttributes => {
                "successful-ok-ignored-or-substituted-attributes"
            }
            Self::SuccessfulOkConflictingAttributes => "successful-ok-conflicting-attributes",
            Self::ClientErrorBadRequest => "client-error-bad-request",
            Self::ClientErrorForbidden => "client-error-forbidden",
            Self::ClientErrorNotAuthenticated => "client-error-not-authenticated",
            Self::ClientErrorNotAuthorized => "client-error-not-authorized",
            Self::ClientErrorNotPossible => "client-error-not-possible",
            Self::ClientErrorTimeout => "client-error-timeout",
            Self::ClientErrorNotFound => "client-error-not-found",
            Self::ClientErrorGone => "client-error-gone",
            Self::ClientErrorRequestEntityTooLarge => "client-error-request-entity-too-large",
            Self::ClientErrorRequestValueTooLong => "client-error-request-value-too-long",
            Self::ClientErrorDocumentFormatNotSupported => {
                "client-error-document-format-not-supported"
            }
            Self::ClientErrorAttributesOrValuesNotSupported => {
                "client-error-attributes-or-values-not-supported"
            }
            Self::ClientErrorUriSchemeNotSupported => "client-error-uri-scheme-not-supported",
            Self::ClientErrorCharsetNotSupported => "client-error-charset-not-supported",
            Self::ClientErrorConflictingAttributes => "client-error-conflicting-attributes",
            Self::ClientErrorCompressionNotSupported => "client-error-compression-not-supported",
            Self::ClientErrorCompressionError => "client-error-compression-error",
            Self::ClientErrorDocumentFormatError => "client-error-document-format-error",
            Self::ClientErrorDocumentAccessError => "client-error-document-access-error",
            Self::ServerErrorInternalError => "server-error-internal-error",
            Self::ServerErrorOperationNotSupported => "server-error-operation-not-supported",
            Self::ServerErrorServiceUnavailable => "server-error-service-unavailable",
            Self::ServerErrorVersionNotSupported => "server-error-version-not-supported",
            Self::ServerErrorDeviceError => "server-error-device-error",
            Self::ServerErrorTemporaryError => "server-error-temporary-error",
            Self::ServerErrorNotAcceptingJobs => "server-error-not-accepting-jobs",
            Self::ServerErrorBusy => "server-error-busy",
            Self::ServerErrorJobCanceled => "server-error-job-canceled",
            Self::ServerErrorMultipleDocumentJobsNotSupported => {
                "server-error-multiple-document-jobs-not-supported"
            }
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
