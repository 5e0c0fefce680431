// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The IPP request handler.
//
// `PrintService` owns every configured printer plus the document spool and
// turns one request body into one response body.  It never fails: decode
// errors, preamble violations and operation errors all become IPP error
// responses carrying a `status-message`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use spielwerk_core::config::ServerConfig;
use spielwerk_core::error::{Result, SpielwerkError};
use spielwerk_ipp::{GroupTag, IppError, IppVersion, Message, Operation, StatusCode};
use spielwerk_print::attributes::printer_uri;
use spielwerk_print::{Printer, Spool};

use crate::operations;

pub struct PrintService {
    printers: BTreeMap<String, Arc<Printer>>,
    default_printer: Arc<Printer>,
    spool: Spool,
    hostname: String,
    port: u16,
}

impl PrintService {
    /// Build every printer named in `config` and open the spool directory.
    /// Printers are created stopped; call [`PrintService::start`].
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        config.validate()?;
        let spool = Spool::open(config.spool_dir.clone())?;
        let printers = config
            .printers
            .iter()
            .map(|pc| Printer::new(pc.clone()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(
            printers,
            &config.default_printer,
            spool,
            config.hostname.clone(),
            config.port,
        )
    }

    pub fn new(
        printers: Vec<Printer>,
        default_printer: &str,
        spool: Spool,
        hostname: impl Into<String>,
        port: u16,
    ) -> Result<Self> {
        let printers: BTreeMap<String, Arc<Printer>> = printers
            .into_iter()
            .map(|p| (p.name().to_owned(), Arc::new(p)))
            .collect();
        let default = printers
            .get(default_printer)
            .cloned()
            .ok_or_else(|| SpielwerkError::UnknownPrinter(default_printer.to_owned()))?;
        Ok(Self {
            printers,
            default_printer: default,
            spool,
            hostname: hostname.into(),
            port,
        })
    }

    /// Start every printer's worker.
    pub fn start(&self) -> Result<()> {
        for printer in self.printers.values() {
            if !printer.is_running() {
                printer.start()?;
            }
        }
        info!(printers = self.printers.len(), "print service started");
        Ok(())
    }

    /// Stop every printer, aborting whatever is playing.
    pub fn stop(&self) {
        for printer in self.printers.values() {
            if let Err(e) = printer.stop() {
                warn!(printer = printer.name(), error = %e, "failed to stop printer");
            }
        }
        info!("print service stopped");
    }

    pub fn printer(&self, name: &str) -> Option<&Arc<Printer>> {
        self.printers.get(name)
    }

    pub fn printers(&self) -> impl Iterator<Item = &Arc<Printer>> {
        self.printers.values()
    }

    pub fn default_printer(&self) -> &Arc<Printer> {
        &self.default_printer
    }

    pub fn spool(&self) -> &Spool {
        &self.spool
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn printer_uri(&self, printer: &Printer) -> String {
        printer_uri(&self.hostname, self.port, printer.name())
    }

    /// Decode `body`, run the operation, and pack the response.
    pub fn handle(&self, body: &[u8]) -> Vec<u8> {
        match Message::parse(body) {
            Ok(request) => self.handle_message(&request).pack(),
            Err(e) => {
                let (version, request_id) = request_header(body);
                warn!(request_id, error = %e, "malformed IPP request");
                IppError::from(e).to_response(version, request_id).pack()
            }
        }
    }

    /// Run one decoded request.
    pub fn handle_message(&self, request: &Message) -> Message {
        debug!(
            version = %request.version,
            operation = format_args!("{:#06x}", request.code),
            request_id = request.request_id,
            groups = request.groups().len(),
            data_bytes = request.data().len(),
            "handling IPP request"
        );
        match self.process(request) {
            Ok(response) => response,
            Err(e) => {
                if e.status.code() >= 0x0500 {
                    warn!(request_id = request.request_id, error = %e, "IPP request failed");
                } else {
                    debug!(request_id = request.request_id, error = %e, "IPP request rejected");
                }
                e.to_response(request.version, request.request_id)
            }
        }
    }

    fn process(&self, request: &Message) -> std::result::Result<Message, IppError> {
        self.check_version(request.version)?;
        check_preamble(request)?;
        let op = Operation::try_from(request.code).map_err(|code| {
            IppError::new(
                StatusCode::ServerErrorOperationNotSupported,
                format!("operation {code:#06x} is not supported"),
            )
        })?;
        let mut response =
            Message::response(request.version, StatusCode::SuccessfulOk, request.request_id)?;
        operations::dispatch(self, op, request, &mut response)?;
        Ok(response)
    }

    fn check_version(&self, version: IppVersion) -> std::result::Result<(), IppError> {
        if self
            .default_printer
            .config()
            .accepts_version(version.major, version.minor)
        {
            Ok(())
        } else {
            Err(IppError::new(
                StatusCode::ServerErrorVersionNotSupported,
                format!("IPP version {version} is not supported"),
            ))
        }
    }
}

/// Version and request id from a body that may not decode.
pub(crate) fn request_header(body: &[u8]) -> (IppVersion, u32) {
    match body {
        [major, minor, _, _, a, b, c, d, ..] => (
            IppVersion {
                major: *major,
                minor: *minor,
            },
            u32::from_be_bytes([*a, *b, *c, *d]),
        ),
        _ => (IppVersion::V1_1, 0),
    }
}

/// The operation group must come first, opening with `attributes-charset`
/// then `attributes-natural-language`.
fn check_preamble(request: &Message) -> std::result::Result<(), IppError> {
    let group = request
        .groups()
        .first()
        .filter(|g| g.tag() == GroupTag::Operation)
        .ok_or_else(|| IppError::bad_request("request must start with the operation group"))?;
    let mut attrs = group.iter();
    let charset = attrs
        .next()
        .filter(|a| a.name_str() == "attributes-charset")
        .ok_or_else(|| IppError::bad_request("attributes-charset must be the first attribute"))?;
    let language = attrs
        .next()
        .filter(|a| a.name_str() == "attributes-natural-language")
        .ok_or_else(|| {
            IppError::bad_request("attributes-natural-language must be the second attribute")
        })?;

    if !charset
        .first()
        .as_str()
        .is_some_and(|c| c.eq_ignore_ascii_case("utf-8"))
    {
        return Err(IppError {
            unsupported: vec![charset.clone()],
            ..IppError::new(
                StatusCode::ClientErrorCharsetNotSupported,
                "only the utf-8 charset is supported",
            )
        });
    }
    if !language
        .first()
        .as_str()
        .is_some_and(|l| l.eq_ignore_ascii_case("en-us"))
    {
        return Err(IppError::attributes(
            "only the en-us natural language is supported",
            vec![language.clone()],
        ));
    }
    Ok(())
}
