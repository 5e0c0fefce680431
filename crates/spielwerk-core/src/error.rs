// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Spielwerk.

use thiserror::Error;

use crate::types::{JobId, JobState};

/// Top-level error type for all Spielwerk operations.
#[derive(Debug, Error)]
pub enum SpielwerkError {
    // -- Wire codec errors --
    #[error("malformed value: {0}")]
    MalformedValue(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("attribute {0} has no values")]
    EmptyAttribute(String),

    #[error("invalid attribute name: {0}")]
    InvalidAttributeName(String),

    #[error("attribute {0} mixes value tag families")]
    MixedValueFamilies(String),

    // -- Job / printer errors --
    #[error("job {id} cannot {action} while {state}")]
    InvalidJobState {
        id: JobId,
        state: JobState,
        action: &'static str,
    },

    #[error("no such job: {0}")]
    InvalidJob(JobId),

    #[error("job {0} has no document")]
    MissingDocument(JobId),

    #[error("printer {name} is {reason}")]
    InvalidPrinterState { name: String, reason: &'static str },

    #[error("no such printer: {0}")]
    UnknownPrinter(String),

    // -- Playback --
    #[error("playback failed: {0}")]
    Playback(String),

    #[error("queue interrupted")]
    Interrupted,

    // -- Server / configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("print server error: {0}")]
    PrintServer(String),

    // -- Storage --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SpielwerkError>;
