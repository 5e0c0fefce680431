// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The operation table.  Each handler reads the decoded request and fills the
// in-progress response, which already carries the charset/language preamble.
//
//   Print-Job              (0x0002)  RFC 2911 §3.2.1
//   Validate-Job           (0x0004)  RFC 2911 §3.2.3
//   Create-Job             (0x0005)  RFC 2911 §3.2.4
//   Send-Document          (0x0006)  RFC 2911 §3.3.1
//   Cancel-Job             (0x0008)  RFC 2911 §3.3.3
//   Get-Job-Attributes     (0x0009)  RFC 2911 §3.3.4
//   Get-Jobs               (0x000A)  RFC 2911 §3.2.6
//   Get-Printer-Attributes (0x000B)  RFC 2911 §3.2.5
//   Restart-Job            (0x000E)  RFC 2911 §3.3.7
//   Pause-Printer          (0x0010)  RFC 2911 §3.2.7
//   Resume-Printer         (0x0011)  RFC 2911 §3.2.8
//   Promote-Job            (0x0030)
//   CUPS-Get-Default       (0x4001)
//   CUPS-Get-Printers      (0x4002)
//   CUPS-Get-Classes       (0x4005)

use std::sync::Arc;

use tracing::info;

use spielwerk_core::error::SpielwerkError;
use spielwerk_core::types::JobId;
use spielwerk_ipp::{Attribute, AttributeGroup, GroupTag, IppError, Message, Operation, StatusCode, Value};
use spielwerk_print::Printer;
use spielwerk_print::attributes::{
    DOCUMENT_FORMATS, filter_requested, job_description, job_summary, printer_description,
};

use crate::handler::PrintService;

type OpResult = Result<(), IppError>;

/// Get-Jobs filters this server does not implement.
const UNSUPPORTED_GET_JOBS_FILTERS: [&str; 4] =
    ["which-jobs", "my-jobs", "limit", "requested-attributes"];

pub(crate) fn dispatch(
    service: &PrintService,
    op: Operation,
    request: &Message,
    response: &mut Message,
) -> OpResult {
    match op {
        Operation::PrintJob => print_job(service, request, response),
        Operation::ValidateJob => validate_job(service, request),
        Operation::CreateJob => create_job(service, request, response),
        Operation::SendDocument => send_document(service, request, response),
        Operation::CancelJob => cancel_job(service, request),
        Operation::GetJobAttributes => get_job_attributes(service, request, response),
        Operation::GetJobs => get_jobs(service, request, response),
        Operation::GetPrinterAttributes => get_printer_attributes(service, request, response),
        Operation::RestartJob => restart_job(service, request, response),
        Operation::PausePrinter => pause_printer(service, request),
        Operation::ResumePrinter => resume_printer(service, request),
        Operation::PromoteJob => promote_job(service, request),
        Operation::CupsGetDefault => cups_get_default(service, request, response),
        Operation::CupsGetPrinters => cups_get_printers(service, request, response),
        Operation::CupsGetClasses => Ok(()),
        Operation::PrintUri
        | Operation::SendUri
        | Operation::HoldJob
        | Operation::ReleaseJob
        | Operation::PurgeJobs
        | Operation::SetPrinterAttributes
        | Operation::SetJobAttributes
        | Operation::CupsGetDocument => Err(IppError::new(
            StatusCode::ServerErrorOperationNotSupported,
            format!("{op:?} is not supported"),
        )),
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

fn operation_group(request: &Message) -> Result<&AttributeGroup, IppError> {
    request
        .operation_attributes()
        .ok_or_else(|| IppError::bad_request("missing operation attributes"))
}

/// The `<name>` segment of `.../printers/<name>[/<job-id>]`.
fn printer_name(uri: &str) -> Option<&str> {
    let (_, rest) = uri.split_once("/printers/")?;
    rest.split('/').next().filter(|name| !name.is_empty())
}

fn uri_value(attr: &Attribute) -> Result<&str, IppError> {
    attr.first()
        .as_str()
        .ok_or_else(|| IppError::bad_request(format!("{} must be a uri", attr.name_str())))
}

fn target_printer<'s>(
    service: &'s PrintService,
    request: &Message,
) -> Result<&'s Arc<Printer>, IppError> {
    let attr = operation_group(request)?
        .find("printer-uri")
        .ok_or_else(|| IppError::bad_request("missing printer-uri"))?;
    let uri = uri_value(attr)?;
    printer_name(uri)
        .and_then(|name| service.printer(name))
        .ok_or_else(|| IppError::attributes(format!("no printer at {uri}"), vec![attr.clone()]))
}

fn job_id_from(id: i32) -> Result<JobId, IppError> {
    u32::try_from(id)
        .ok()
        .filter(|id| *id > 0)
        .map(JobId::new)
        .ok_or_else(|| IppError::not_found(format!("no job {id}")))
}

/// The printer and job addressed by `printer-uri` + `job-id`, or by
/// `job-uri` alone.
fn target_job<'s>(
    service: &'s PrintService,
    request: &Message,
) -> Result<(&'s Arc<Printer>, JobId), IppError> {
    let op = operation_group(request)?;
    if op.contains("printer-uri") {
        let printer = target_printer(service, request)?;
        let attr = op
            .find("job-id")
            .ok_or_else(|| IppError::bad_request("missing job-id"))?;
        let id = attr
            .first()
            .as_integer()
            .ok_or_else(|| IppError::bad_request("job-id must be an integer"))?;
        return Ok((printer, job_id_from(id)?));
    }

    let attr = op
        .find("job-uri")
        .ok_or_else(|| IppError::bad_request("missing printer-uri or job-uri"))?;
    let uri = uri_value(attr)?;
    let printer = printer_name(uri)
        .and_then(|name| service.printer(name))
        .ok_or_else(|| IppError::attributes(format!("no printer at {uri}"), vec![attr.clone()]))?;
    let id = uri
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<i32>().ok())
        .ok_or_else(|| IppError::attributes(format!("no job id in {uri}"), vec![attr.clone()]))?;
    Ok((printer, job_id_from(id)?))
}

fn requesting_user(op: &AttributeGroup) -> &str {
    op.find("requesting-user-name")
        .and_then(|a| a.first().as_str())
        .unwrap_or("anonymous")
}

fn job_name(op: &AttributeGroup) -> &str {
    op.find("job-name")
        .or_else(|| op.find("document-name"))
        .and_then(|a| a.first().as_str())
        .unwrap_or("untitled")
}

/// `job-priority` from the job template group, falling back to the
/// operation group.
fn job_priority(request: &Message) -> Result<Option<i32>, IppError> {
    let attr = request
        .group(GroupTag::Job)
        .and_then(|g| g.find("job-priority"))
        .or_else(|| {
            request
                .operation_attributes()
                .and_then(|g| g.find("job-priority"))
        });
    let Some(attr) = attr else {
        return Ok(None);
    };
    match attr.first().as_integer() {
        Some(p) if (1..=100).contains(&p) => Ok(Some(p)),
        _ => Err(IppError::attributes(
            "job-priority must be an integer in 1..100",
            vec![attr.clone()],
        )),
    }
}

fn check_document_format(op: &AttributeGroup) -> OpResult {
    let Some(attr) = op.find("document-format") else {
        return Ok(());
    };
    let supported = attr
        .first()
        .as_str()
        .is_some_and(|f| DOCUMENT_FORMATS.iter().any(|s| s.eq_ignore_ascii_case(f)));
    if supported {
        Ok(())
    } else {
        Err(IppError {
            unsupported: vec![attr.clone()],
            ..IppError::new(
                StatusCode::ClientErrorDocumentFormatNotSupported,
                "document-format is not supported",
            )
        })
    }
}

fn requested_attributes(op: &AttributeGroup) -> Vec<String> {
    op.find("requested-attributes")
        .map(|a| {
            a.values()
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn push_job_summary(
    service: &PrintService,
    printer: &Printer,
    id: JobId,
    response: &mut Message,
) -> OpResult {
    let job = printer.job(id).ok_or(SpielwerkError::InvalidJob(id))?;
    response.push_group(job_summary(&job, &service.printer_uri(printer))?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Job submission
// ---------------------------------------------------------------------------

fn print_job(service: &PrintService, request: &Message, response: &mut Message) -> OpResult {
    let printer = target_printer(service, request)?;
    let op = operation_group(request)?;
    check_document_format(op)?;
    let priority = job_priority(request)?;
    if request.data().is_empty() {
        return Err(IppError::bad_request("Print-Job carries no document data"));
    }
    let document = service.spool().store(request.data())?;
    let id = printer.print_job(requesting_user(op), job_name(op), priority, document)?;
    info!(
        printer = printer.name(),
        job_id = %id,
        user = requesting_user(op),
        bytes = request.data().len(),
        "job submitted"
    );
    push_job_summary(service, printer, id, response)
}

fn validate_job(service: &PrintService, request: &Message) -> OpResult {
    target_printer(service, request)?;
    check_document_format(operation_group(request)?)?;
    job_priority(request)?;
    Ok(())
}

fn create_job(service: &PrintService, request: &Message, response: &mut Message) -> OpResult {
    let printer = target_printer(service, request)?;
    let op = operation_group(request)?;
    let priority = job_priority(request)?;
    let id = printer.create_job_with_priority(requesting_user(op), job_name(op), priority)?;
    info!(printer = printer.name(), job_id = %id, "job created, awaiting document");
    push_job_summary(service, printer, id, response)
}

fn send_document(service: &PrintService, request: &Message, response: &mut Message) -> OpResult {
    let (printer, id) = target_job(service, request)?;
    let op = operation_group(request)?;
    let last = op
        .find("last-document")
        .ok_or_else(|| IppError::bad_request("missing last-document"))?;
    match last.first().as_bool() {
        Some(true) => {}
        Some(false) => {
            return Err(IppError::new(
                StatusCode::ServerErrorMultipleDocumentJobsNotSupported,
                "jobs hold exactly one document",
            ));
        }
        None => {
            return Err(IppError::attributes(
                "last-document must be a boolean",
                vec![last.clone()],
            ));
        }
    }
    check_document_format(op)?;
    let document = service.spool().store(request.data())?;
    printer.send_document(id, document)?;
    info!(printer = printer.name(), job_id = %id, bytes = request.data().len(), "document received");
    push_job_summary(service, printer, id, response)
}

// ---------------------------------------------------------------------------
// Job operations
// ---------------------------------------------------------------------------

fn cancel_job(service: &PrintService, request: &Message) -> OpResult {
    let (printer, id) = target_job(service, request)?;
    printer.cancel_job(id)?;
    Ok(())
}

fn get_job_attributes(
    service: &PrintService,
    request: &Message,
    response: &mut Message,
) -> OpResult {
    let (printer, id) = target_job(service, request)?;
    let job = printer.job(id).ok_or(SpielwerkError::InvalidJob(id))?;
    let group = job_description(&job, printer, &service.printer_uri(printer))?;
    let requested = requested_attributes(operation_group(request)?);
    response.push_group(filter_requested(group, &requested));
    Ok(())
}

/// Every job that has not reached a terminal state, in id order.
fn get_jobs(service: &PrintService, request: &Message, response: &mut Message) -> OpResult {
    let printer = target_printer(service, request)?;
    let op = operation_group(request)?;
    let rejected: Vec<Attribute> = UNSUPPORTED_GET_JOBS_FILTERS
        .iter()
        .filter_map(|name| op.find(name))
        .cloned()
        .collect();
    if !rejected.is_empty() {
        return Err(IppError::attributes(
            "Get-Jobs filters are not supported",
            rejected,
        ));
    }
    let uri = service.printer_uri(printer);
    for job in printer.jobs().iter().filter(|job| !job.is_terminal()) {
        response.push_group(job_summary(job, &uri)?);
    }
    Ok(())
}

fn restart_job(service: &PrintService, request: &Message, response: &mut Message) -> OpResult {
    let (printer, id) = target_job(service, request)?;
    let new_id = printer.restart_job(id)?;
    push_job_summary(service, printer, new_id, response)
}

fn promote_job(service: &PrintService, request: &Message) -> OpResult {
    let (printer, id) = target_job(service, request)?;
    printer.promote_job(id)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Printer operations
// ---------------------------------------------------------------------------

fn get_printer_attributes(
    service: &PrintService,
    request: &Message,
    response: &mut Message,
) -> OpResult {
    let printer = target_printer(service, request)?;
    let group = printer_description(printer, &service.printer_uri(printer))?;
    let requested = requested_attributes(operation_group(request)?);
    response.push_group(filter_requested(group, &requested));
    Ok(())
}

fn pause_printer(service: &PrintService, request: &Message) -> OpResult {
    target_printer(service, request)?.pause_printer();
    Ok(())
}

fn resume_printer(service: &PrintService, request: &Message) -> OpResult {
    target_printer(service, request)?.resume_printer();
    Ok(())
}

fn cups_get_default(service: &PrintService, request: &Message, response: &mut Message) -> OpResult {
    let printer = service.default_printer();
    let group = printer_description(printer, &service.printer_uri(printer))?;
    let requested = requested_attributes(operation_group(request)?);
    response.push_group(filter_requested(group, &requested));
    Ok(())
}

fn cups_get_printers(
    service: &PrintService,
    request: &Message,
    response: &mut Message,
) -> OpResult {
    let requested = requested_attributes(operation_group(request)?);
    for printer in service.printers() {
        let group = printer_description(printer, &service.printer_uri(printer))?;
        response.push_group(filter_requested(group, &requested));
    }
    Ok(())
}
