// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP over HTTP/1.1 (RFC 2910 §4).
//
// Clients POST an `application/ipp` body, framed by `Content-Length` or
// chunked transfer coding, optionally after `Expect: 100-continue`.  Each
// connection runs in its own task and serves requests until the client closes
// or asks for `Connection: close`.  The synchronous handler runs on the
// blocking pool; if it panics the client gets `server-error-internal-error`
// and the connection keeps serving.
//
// # mDNS advertisement
//
// With `advertise_mdns` set, every printer is registered as
// `_ipp._tcp.local.` via mDNS-SD and unregistered on stop.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use spielwerk_core::config::ServerConfig;
use spielwerk_core::error::{Result, SpielwerkError};
use spielwerk_core::types::ServerStatus;
use spielwerk_ipp::IppError;
use spielwerk_print::attributes::DOCUMENT_FORMATS;

use crate::handler::{PrintService, request_header};

/// mDNS service type for IPP printers.
pub const IPP_SERVICE_TYPE: &str = "_ipp._tcp.local.";

/// Upper bound on the request line plus headers.
const MAX_HEAD_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// HTTP framing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestHead {
    method: String,
    path: String,
    content_length: Option<usize>,
    chunked: bool,
    expect_continue: bool,
    keep_alive: bool,
}

/// Parse the request line and headers (without the blank line).
fn parse_head(lines: &[String]) -> Result<RequestHead> {
    let request_line = lines
        .first()
        .ok_or_else(|| SpielwerkError::PrintServer("empty HTTP request".into()))?;
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(path), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(SpielwerkError::PrintServer(format!(
            "bad request line: {request_line:?}"
        )));
    };

    let mut head = RequestHead {
        method: method.to_owned(),
        path: path.to_owned(),
        content_length: None,
        chunked: false,
        expect_continue: false,
        keep_alive: version.eq_ignore_ascii_case("HTTP/1.1"),
    };

    for line in &lines[1..] {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "content-length" => {
                let len = value.parse::<usize>().map_err(|_| {
                    SpielwerkError::PrintServer(format!("bad Content-Length: {value:?}"))
                })?;
                head.content_length = Some(len);
            }
            "transfer-encoding" => {
                head.chunked = value
                    .split(',')
                    .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
            }
            "expect" => head.expect_continue = value.eq_ignore_ascii_case("100-continue"),
            "connection" => {
                if value.eq_ignore_ascii_case("close") {
                    head.keep_alive = false;
                } else if value.eq_ignore_ascii_case("keep-alive") {
                    head.keep_alive = true;
                }
            }
            _ => {}
        }
    }
    Ok(head)
}

/// Read the request line and headers.  `Ok(None)` when the client closed
/// the connection between requests.
async fn read_head<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<RequestHead>> {
    let mut lines = Vec::new();
    let mut total = 0;
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            if lines.is_empty() {
                return Ok(None);
            }
            return Err(SpielwerkError::PrintServer(
                "connection closed inside HTTP headers".into(),
            ));
        }
        total += n;
        if total > MAX_HEAD_BYTES {
            return Err(SpielwerkError::PrintServer("HTTP headers too large".into()));
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            // tolerate stray CRLF between pipelined requests
            if lines.is_empty() {
                continue;
            }
            break;
        }
        lines.push(line.to_owned());
    }
    parse_head(&lines).map(Some)
}

/// Decode a chunked body.  `Ok(None)` once it grows past `limit`.
async fn read_chunked<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    limit: usize,
) -> Result<Option<Vec<u8>>> {
    let mut body = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(SpielwerkError::PrintServer(
                "connection closed inside chunked body".into(),
            ));
        }
        let size_field = line.trim().split(';').next().unwrap_or_default();
        let size = usize::from_str_radix(size_field, 16)
            .map_err(|_| SpielwerkError::PrintServer(format!("bad chunk size: {size_field:?}")))?;

        if size == 0 {
            // trailer section ends with an empty line
            loop {
                line.clear();
                if reader.read_line(&mut line).await? == 0 || line.trim().is_empty() {
                    return Ok(Some(body));
                }
            }
        }
        if body.len().saturating_add(size) > limit {
            return Ok(None);
        }
        let start = body.len();
        body.resize(start + size, 0);
        reader.read_exact(&mut body[start..]).await?;
        line.clear();
        reader.read_line(&mut line).await?;
    }
}

async fn send_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    ipp_body: &[u8],
    keep_alive: bool,
) -> Result<()> {
    let http_response = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: application/ipp\r\n\
         Content-Length: {}\r\n\
         Connection: {}\r\n\
         \r\n",
        ipp_body.len(),
        if keep_alive { "keep-alive" } else { "close" }
    );
    writer.write_all(http_response.as_bytes()).await?;
    writer.write_all(ipp_body).await?;
    writer.flush().await?;
    Ok(())
}

async fn send_status<W: AsyncWrite + Unpin>(writer: &mut W, status: &str) -> Result<()> {
    let http_response = format!(
        "HTTP/1.1 {status}\r\n\
         Allow: POST\r\n\
         Content-Length: 0\r\n\
         Connection: close\r\n\
         \r\n"
    );
    writer.write_all(http_response.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared state passed to connection handlers
// ---------------------------------------------------------------------------

struct SharedState {
    /// The printers and spool every request is dispatched to.
    service: Arc<PrintService>,
    /// Counter of active connections, shared with [`IppServer`].
    active_connections: Arc<AtomicU32>,
    /// Largest request body accepted before answering 413.
    max_request_bytes: usize,
}

// ---------------------------------------------------------------------------
// IppServer
// ---------------------------------------------------------------------------

/// The network front of a [`PrintService`].
pub struct IppServer {
    service: Arc<PrintService>,
    /// Address the listener binds to.
    bind_address: IpAddr,
    /// The TCP port to listen on; 0 picks a free one.
    port: u16,
    max_request_bytes: usize,
    /// Whether printers are advertised as `_ipp._tcp` on start.
    advertise_mdns: bool,
    /// Current lifecycle state of the server.
    status: ServerStatus,
    /// Where the listener actually bound, once started.
    local_addr: Option<SocketAddr>,
    /// Notification handle used to signal a graceful shutdown.
    shutdown_signal: Arc<Notify>,
    /// Handle to the Tokio task running the accept loop.
    task_handle: Option<JoinHandle<()>>,
    /// Counter of currently active TCP connections.
    active_connections: Arc<AtomicU32>,
    /// Handle to the mDNS daemon for service advertisement.
    mdns_daemon: Option<mdns_sd::ServiceDaemon>,
    /// Registered mDNS service fullnames, one per printer.
    mdns_fullnames: Vec<String>,
}

impl IppServer {
    /// Create a server in `Stopped` state.  Call [`IppServer::start`] to begin
    /// accepting connections.
    pub fn new(service: Arc<PrintService>, config: &ServerConfig) -> Self {
        Self {
            service,
            bind_address: config.bind_address,
            port: config.port,
            max_request_bytes: config.max_request_bytes,
            advertise_mdns: config.advertise_mdns,
            status: ServerStatus::Stopped,
            local_addr: None,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
            mdns_daemon: None,
            mdns_fullnames: Vec::new(),
        }
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// The bound address once started (resolves port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn service(&self) -> &Arc<PrintService> {
        &self.service
    }

    /// Bind the listener and spawn the accept loop.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let (ServerStatus::Running, Some(addr)) = (self.status, self.local_addr) {
            debug!(%addr, "IPP server already running");
            return Ok(addr);
        }

        self.status = ServerStatus::Starting;

        let bind_addr = SocketAddr::new(self.bind_address, self.port);
        let listener = match TcpListener::bind(bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.status = ServerStatus::Error;
                return Err(SpielwerkError::PrintServer(format!("bind {bind_addr}: {e}")));
            }
        };
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        info!(addr = %local_addr, "IPP server listening");

        if self.advertise_mdns {
            self.register_mdns(local_addr.port());
        }

        let shutdown = Arc::clone(&self.shutdown_signal);
        let shared = Arc::new(SharedState {
            service: Arc::clone(&self.service),
            active_connections: Arc::clone(&self.active_connections),
            max_request_bytes: self.max_request_bytes,
        });

        let handle = tokio::spawn(async move {
            Self::accept_loop(listener, shutdown, shared).await;
        });

        self.task_handle = Some(handle);
        self.status = ServerStatus::Running;
        Ok(local_addr)
    }

    /// Stop accepting connections and withdraw the mDNS advertisement.
    /// Connections already in flight finish their current request.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != ServerStatus::Running {
            return Ok(());
        }

        info!(addr = ?self.local_addr, "stopping IPP server");

        self.unregister_mdns();
        self.shutdown_signal.notify_one();

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| SpielwerkError::PrintServer(format!("task join: {e}")))?;
        }

        self.status = ServerStatus::Stopped;
        info!("IPP server stopped");
        Ok(())
    }

    /// Register every printer as `_ipp._tcp.local.`.
    ///
    /// Failures are logged and otherwise ignored; printers stay reachable by
    /// address.
    fn register_mdns(&mut self, port: u16) {
        let daemon = match mdns_sd::ServiceDaemon::new() {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "failed to create mDNS daemon for advertisement");
                return;
            }
        };

        let host = format!("{}.local.", self.service.hostname());
        let pdl = DOCUMENT_FORMATS.join(",");

        for printer in self.service.printers() {
            let rp = format!("printers/{}", printer.name());
            let ty = format!("Spielwerk {}", printer.name());
            let properties = [
                ("txtvers", "1"),
                ("qtotal", "1"),
                ("rp", rp.as_str()),
                ("ty", ty.as_str()),
                ("note", printer.config().location.as_str()),
                ("pdl", pdl.as_str()),
            ];

            let service_info = match mdns_sd::ServiceInfo::new(
                IPP_SERVICE_TYPE,
                printer.name(),
                &host,
                "",
                port,
                &properties[..],
            ) {
                Ok(info) => info.enable_addr_auto(),
                Err(e) => {
                    warn!(printer = printer.name(), error = %e, "failed to create mDNS ServiceInfo");
                    continue;
                }
            };

            let fullname = service_info.get_fullname().to_owned();
            match daemon.register(service_info) {
                Ok(()) => {
                    info!(
                        service_type = IPP_SERVICE_TYPE,
                        name = %fullname,
                        port,
                        "mDNS service registered"
                    );
                    self.mdns_fullnames.push(fullname);
                }
                Err(e) => warn!(printer = printer.name(), error = %e, "failed to register mDNS service"),
            }
        }

        self.mdns_daemon = Some(daemon);
    }

    fn unregister_mdns(&mut self) {
        let Some(daemon) = self.mdns_daemon.take() else {
            return;
        };
        for fullname in self.mdns_fullnames.drain(..) {
            match daemon.unregister(&fullname) {
                Ok(_) => info!(name = %fullname, "mDNS service unregistered"),
                Err(e) => warn!(name = %fullname, error = %e, "failed to unregister mDNS service"),
            }
        }
        if let Err(e) = daemon.shutdown() {
            warn!(error = %e, "failed to shut down mDNS daemon");
        }
    }

    async fn accept_loop(listener: TcpListener, shutdown: Arc<Notify>, shared: Arc<SharedState>) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("accept loop received shutdown signal");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            debug!(peer = %peer_addr, "incoming IPP connection");
                            let state = Arc::clone(&shared);
                            tokio::spawn(async move {
                                state.active_connections.fetch_add(1, Ordering::Relaxed);
                                if let Err(e) = Self::handle_connection(stream, peer_addr, &state).await {
                                    warn!(peer = %peer_addr, error = %e, "connection handler error");
                                }
                                state.active_connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }
    }

    /// Serve requests on one connection until it closes.
    async fn handle_connection(
        stream: TcpStream,
        peer_addr: SocketAddr,
        state: &SharedState,
    ) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        while let Some(head) = read_head(&mut reader).await? {
            if !head.method.eq_ignore_ascii_case("POST") {
                debug!(peer = %peer_addr, method = %head.method, path = %head.path, "non-POST request");
                return send_status(&mut writer, "405 Method Not Allowed").await;
            }
            if head.content_length.is_some_and(|len| len > state.max_request_bytes) {
                warn!(peer = %peer_addr, length = ?head.content_length, "request too large");
                return send_status(&mut writer, "413 Payload Too Large").await;
            }
            if head.expect_continue {
                writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
                writer.flush().await?;
            }

            let mut keep_alive = head.keep_alive;
            let body = if head.chunked {
                match read_chunked(&mut reader, state.max_request_bytes).await? {
                    Some(body) => body,
                    None => {
                        warn!(peer = %peer_addr, "chunked request too large");
                        return send_status(&mut writer, "413 Payload Too Large").await;
                    }
                }
            } else if let Some(len) = head.content_length {
                let mut body = vec![0; len];
                reader.read_exact(&mut body).await?;
                body
            } else {
                // no framing: the body runs to end of stream
                keep_alive = false;
                let mut body = Vec::new();
                let limit = u64::try_from(state.max_request_bytes).unwrap_or(u64::MAX);
                (&mut reader).take(limit).read_to_end(&mut body).await?;
                body
            };

            debug!(peer = %peer_addr, path = %head.path, bytes = body.len(), "received IPP request");

            let response = Self::run_handler(&state.service, body).await;
            send_response(&mut writer, &response, keep_alive).await?;

            debug!(peer = %peer_addr, response_bytes = response.len(), "IPP response sent");

            if !keep_alive {
                break;
            }
        }
        Ok(())
    }

    /// Run the synchronous handler on the blocking pool.
    async fn run_handler(service: &Arc<PrintService>, body: Vec<u8>) -> Vec<u8> {
        let (version, request_id) = request_header(&body);
        let service = Arc::clone(service);
        match tokio::task::spawn_blocking(move || service.handle(&body)).await {
            Ok(response) => response,
            Err(e) => {
                error!(request_id, error = %e, "IPP handler panicked");
                IppError::internal("internal error while handling the request")
                    .to_response(version, request_id)
                    .pack()
            }
        }
    }
}
