// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spielwerk Print: the job lifecycle engine.  A `Printer` owns its jobs and
// a worker thread that pops job ids from a `PausingQueue` and plays each
// spooled document through a supervised `Player`, one at a time.

pub mod attributes;
pub mod job;
pub mod player;
pub mod printer;
pub mod queue;
pub mod spool;

pub use job::Job;
pub use player::{PlaybackMode, PlaybackOutcome, Player, PlayerState};
pub use printer::Printer;
pub use queue::PausingQueue;
pub use spool::{DocumentHandle, Spool};
