// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spielwerk Server: answers IPP requests for a set of audio printers.
// `PrintService` maps request bodies to response bodies; `IppServer` carries
// them over HTTP/1.1 and advertises the printers over mDNS.

pub mod handler;
mod operations;
pub mod transport;

pub use handler::PrintService;
pub use transport::{IPP_SERVICE_TYPE, IppServer};
