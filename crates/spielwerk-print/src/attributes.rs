// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer and job state rendered as IPP attribute groups.

use chrono::{DateTime, Utc};

use spielwerk_core::error::Result;
use spielwerk_ipp::{Attribute, AttributeGroup, GroupTag, Operation, Value, ValueTag};

use crate::job::Job;
use crate::printer::Printer;

/// Operations answered by the server, in `operations-supported` order.
pub const OPERATIONS_SUPPORTED: [Operation; 15] = [
    Operation::PrintJob,
    Operation::ValidateJob,
    Operation::CreateJob,
    Operation::SendDocument,
    Operation::CancelJob,
    Operation::GetJobAttributes,
    Operation::GetJobs,
    Operation::GetPrinterAttributes,
    Operation::RestartJob,
    Operation::PausePrinter,
    Operation::ResumePrinter,
    Operation::PromoteJob,
    Operation::CupsGetDefault,
    Operation::CupsGetPrinters,
    Operation::CupsGetClasses,
];

pub const DOCUMENT_FORMATS: [&str; 6] = [
    "application/octet-stream",
    "audio/mpeg",
    "audio/ogg",
    "audio/flac",
    "audio/x-wav",
    "audio/mp4",
];

/// `ipp://host:port/printers/name`
pub fn printer_uri(host: &str, port: u16, name: &str) -> String {
    format!("ipp://{host}:{port}/printers/{name}")
}

pub fn job_uri(printer_uri: &str, job: &Job) -> String {
    format!("{printer_uri}/{}", job.id())
}

/// Seconds between printer creation and `at`, or `no-value`.
fn printer_time(printer: &Printer, at: Option<DateTime<Utc>>) -> Value {
    match at {
        Some(t) => {
            let secs = (t - printer.created_at()).num_seconds();
            Value::integer(i32::try_from(secs).unwrap_or(i32::MAX).max(0))
        }
        None => Value::out_of_band(ValueTag::NO_VALUE),
    }
}

/// Printer description attributes (RFC 2911 §4.4).
pub fn printer_description(printer: &Printer, uri: &str) -> Result<AttributeGroup> {
    let config = printer.config();
    let state = printer.state();
    let versions: Vec<&str> = config.ipp_versions.iter().map(String::as_str).collect();
    let queued = i32::try_from(printer.queued_job_count()).unwrap_or(i32::MAX);

    let mut group = AttributeGroup::new(GroupTag::Printer);
    group.set(Attribute::uri("printer-uri-supported", uri)?);
    group.set(Attribute::keyword("uri-authentication-supported", "none")?);
    group.set(Attribute::keyword("uri-security-supported", "none")?);
    group.set(Attribute::name("printer-name", printer.name())?);
    group.set(Attribute::text("printer-info", &config.info)?);
    group.set(Attribute::text("printer-location", &config.location)?);
    group.set(Attribute::text("printer-make-and-model", "Spielwerk audio printer")?);
    group.set(Attribute::enumeration("printer-state", state.ipp_value())?);
    group.set(Attribute::keyword("printer-state-reasons", state.reason())?);
    group.set(Attribute::keywords("ipp-versions-supported", versions)?);
    group.set(Attribute::enumerations(
        "operations-supported",
        OPERATIONS_SUPPORTED.iter().map(|op| i32::from(op.code())),
    )?);
    group.set(Attribute::boolean("multiple-document-jobs-supported", false)?);
    group.set(Attribute::integer("multiple-operation-time-out", 240)?);
    group.set(Attribute::charset("charset-configured", "utf-8")?);
    group.set(Attribute::charset("charset-supported", "utf-8")?);
    group.set(Attribute::natural_language("natural-language-configured", "en-us")?);
    group.set(Attribute::natural_language(
        "generated-natural-language-supported",
        "en-us",
    )?);
    group.set(Attribute::mime_media_type(
        "document-format-default",
        DOCUMENT_FORMATS[0],
    )?);
    group.set(Attribute::mime_media_types(
        "document-format-supported",
        DOCUMENT_FORMATS,
    )?);
    group.set(Attribute::boolean(
        "printer-is-accepting-jobs",
        printer.is_running(),
    )?);
    group.set(Attribute::integer("queued-job-count", queued)?);
    group.set(Attribute::keyword("pdl-override-supported", "not-attempted")?);
    group.set(Attribute::integer("printer-up-time", printer.uptime_secs())?);
    group.set(Attribute::single(
        "printer-current-time",
        Value::date_time(Utc::now().into()),
    )?);
    group.set(Attribute::keyword("compression-supported", "none")?);
    group.set(Attribute::integer("job-priority-default", 50)?);
    group.set(Attribute::single("job-priority-supported", Value::integer(100))?);
    Ok(group)
}

/// The four attributes returned when a job is created.
pub fn job_summary(job: &Job, printer_uri: &str) -> Result<AttributeGroup> {
    let mut group = AttributeGroup::new(GroupTag::Job);
    group.set(Attribute::uri("job-uri", &job_uri(printer_uri, job))?);
    group.set(Attribute::integer("job-id", job.id().as_ipp())?);
    group.set(Attribute::enumeration("job-state", job.state().ipp_value())?);
    group.set(Attribute::keyword("job-state-reasons", job.state_reasons())?);
    Ok(group)
}

/// Job description attributes (RFC 2911 §4.3).
pub fn job_description(job: &Job, printer: &Printer, printer_uri: &str) -> Result<AttributeGroup> {
    let mut group = job_summary(job, printer_uri)?;
    group.set(Attribute::name("job-name", job.name())?);
    group.set(Attribute::name("job-originating-user-name", job.creator())?);
    group.set(Attribute::integer("job-priority", i32::from(job.priority()))?);
    group.set(Attribute::uri("job-printer-uri", printer_uri)?);
    let k_octets = job.document().map_or(0, |d| d.size().div_ceil(1024));
    group.set(Attribute::integer(
        "job-k-octets",
        i32::try_from(k_octets).unwrap_or(i32::MAX),
    )?);
    group.set(Attribute::single(
        "time-at-creation",
        printer_time(printer, Some(job.created_at())),
    )?);
    group.set(Attribute::single(
        "time-at-processing",
        printer_time(printer, job.processing_at()),
    )?);
    group.set(Attribute::single(
        "time-at-completed",
        printer_time(printer, job.completed_at()),
    )?);
    group.set(Attribute::single(
        "date-time-at-creation",
        Value::date_time(job.created_at().into()),
    )?);
    group.set(Attribute::integer(
        "job-printer-up-time",
        printer.uptime_secs(),
    )?);
    Ok(group)
}

/// Restrict `group` to `requested-attributes`.  `all` and the group
/// keywords select everything; unknown names are ignored.
pub fn filter_requested(group: AttributeGroup, requested: &[String]) -> AttributeGroup {
    let everything = requested.is_empty()
        || requested.iter().any(|r| {
            matches!(
                r.as_str(),
                "all" | "printer-description" | "job-description" | "job-template"
            )
        });
    if everything {
        return group;
    }
    let kept = group
        .iter()
        .filter(|a| requested.iter().any(|r| r == a.name_str()))
        .cloned()
        .collect();
    AttributeGroup::with_attributes(group.tag(), kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spielwerk_core::config::PrinterConfig;
    use spielwerk_core::types::{JobId, JobState, PrinterState};

    use crate::spool::Spool;

    const URI: &str = "ipp://localhost:631/printers/jukebox";

    fn printer() -> Printer {
        Printer::new(PrinterConfig::dry_run("jukebox", 10)).expect("printer")
    }

    #[test]
    fn printer_uri_layout() {
        assert_eq!(printer_uri("localhost", 631, "jukebox"), URI);
    }

    #[test]
    fn printer_description_reports_state() {
        let p = printer();
        let group = printer_description(&p, URI).expect("attrs");
        assert_eq!(group.tag(), GroupTag::Printer);
        assert_eq!(group.get_str("printer-name").expect("name"), "jukebox");
        assert_eq!(
            group.get_integer("printer-state").expect("state"),
            PrinterState::Stopped.ipp_value()
        );
        assert!(!group.get_bool("printer-is-accepting-jobs").expect("accepting"));
        let ops = group.get("operations-supported").expect("ops");
        assert_eq!(ops.values().len(), OPERATIONS_SUPPORTED.len());
        assert!(group.get_integer("printer-up-time").expect("up-time") >= 1);
        let versions = group.get("ipp-versions-supported").expect("versions");
        assert_eq!(versions.values().len(), 2);
    }

    #[test]
    fn job_description_for_pending_job() {
        let dir = tempfile::tempdir().expect("tempdir");
        let spool = Spool::open(dir.path()).expect("spool");
        let p = printer();
        let id = p
            .print_job("alice", "side a", Some(70), spool.store(&[0u8; 1500]).expect("store"))
            .expect("job");
        let job = p.job(id).expect("job");
        let group = job_description(&job, &p, URI).expect("attrs");
        assert_eq!(group.get_integer("job-id").expect("id"), 1);
        assert_eq!(group.get_str("job-uri").expect("uri"), format!("{URI}/1"));
        assert_eq!(
            group.get_integer("job-state").expect("state"),
            JobState::Pending.ipp_value()
        );
        assert_eq!(group.get_str("job-originating-user-name").expect("user"), "alice");
        assert_eq!(group.get_integer("job-priority").expect("priority"), 70);
        assert_eq!(group.get_integer("job-k-octets").expect("k-octets"), 2);
        let processing = group.get("time-at-processing").expect("time-at-processing");
        assert_eq!(processing.first().tag(), ValueTag::NO_VALUE);
        assert_eq!(job.id(), JobId::new(1));
    }

    #[test]
    fn filter_keeps_requested_names_only() {
        let p = printer();
        let group = printer_description(&p, URI).expect("attrs");
        let total = group.len();
        let filtered = filter_requested(
            group.clone(),
            &["printer-name".into(), "printer-state".into(), "bogus".into()],
        );
        assert_eq!(filtered.len(), 2);
        assert!(filtered.contains("printer-state"));
        assert_eq!(filter_requested(group, &["all".into()]).len(), total);
    }
}
