// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Spielwerk print server.

use serde::{Deserialize, Serialize};

/// Identifier of a print job. Allocated per printer starting at 1; 0 is
/// never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(u32);

impl JobId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw sequence number.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The IPP `job-id` integer for this job.
    pub fn as_ipp(self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a print job (RFC 2911 §4.3.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Created but not yet queued.
    Held,
    /// Queued, possibly still waiting for its document.
    Pending,
    /// Handed to a player and playing.
    Processing,
    /// Reported while the printer holds an active job paused.
    ProcessingStopped,
    /// Canceled by a client or replaced by Restart-Job.
    Canceled,
    /// Playback failed or was cut short by a printer stop.
    Aborted,
    /// Played to the end.
    Completed,
}

impl JobState {
    /// Numeric value of the `job-state` enum on the wire.
    pub const fn ipp_value(self) -> i32 {
        match self {
            Self::Pending => 3,
            Self::Held => 4,
            Self::Processing => 5,
            Self::ProcessingStopped => 6,
            Self::Canceled => 7,
            Self::Aborted => 8,
            Self::Completed => 9,
        }
    }

    /// Whether the job can no longer change state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Aborted | Self::Completed)
    }

    /// Lowercase keyword, as shown in logs.
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Held => "held",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::ProcessingStopped => "processing-stopped",
            Self::Canceled => "canceled",
            Self::Aborted => "aborted",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// `printer-state` values (RFC 2911 §4.4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterState {
    /// Running with nothing queued or playing.
    Idle,
    /// Running with a job playing or queued.
    Processing,
    /// Not started, or paused by Pause-Printer.
    Stopped,
}

impl PrinterState {
    /// Numeric value of the `printer-state` enum on the wire.
    pub const fn ipp_value(self) -> i32 {
        match self {
            Self::Idle => 3,
            Self::Processing => 4,
            Self::Stopped => 5,
        }
    }

    /// Matching `printer-state-reasons` keyword.
    pub const fn reason(self) -> &'static str {
        match self {
            Self::Idle | Self::Processing => "none",
            Self::Stopped => "paused",
        }
    }
}

impl std::fmt::Display for PrinterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Status of the network-facing IPP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    /// Not listening.
    Stopped,
    /// Binding the listener.
    Starting,
    /// Accepting connections.
    Running,
    /// The listener could not be bound.
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_state_wire_values_match_rfc2911() {
        assert_eq!(JobState::Pending.ipp_value(), 3);
        assert_eq!(JobState::Held.ipp_value(), 4);
        assert_eq!(JobState::ProcessingStopped.ipp_value(), 6);
        assert_eq!(JobState::Completed.ipp_value(), 9);
    }

    #[test]
    fn only_final_states_are_terminal() {
        assert!(!JobState::Held.is_terminal());
        assert!(!JobState::Processing.is_terminal());
        assert!(JobState::Canceled.is_terminal());
        assert!(JobState::Aborted.is_terminal());
    }

    #[test]
    fn job_id_displays_as_number() {
        assert_eq!(JobId::new(12).to_string(), "12");
        assert_eq!(JobId::new(u32::MAX).as_ipp(), i32::MAX);
    }
}
