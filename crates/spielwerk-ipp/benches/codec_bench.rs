// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for IPP message decoding and response packing.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use spielwerk_ipp::{
    Attribute, AttributeGroup, GroupTag, IppVersion, Message, Operation, StatusCode, Value,
};

// ---------------------------------------------------------------------------
// Helper: a request built through the codec itself
// ---------------------------------------------------------------------------

fn build_request(op: Operation, request_id: u32, job_name: Option<&str>, document: &[u8]) -> Vec<u8> {
    let mut msg = Message::new(IppVersion::V1_1, op.code(), request_id);
    let mut group = AttributeGroup::new(GroupTag::Operation);
    group.set(Attribute::charset("attributes-charset", "utf-8").expect("charset"));
    group.set(
        Attribute::natural_language("attributes-natural-language", "en-us").expect("language"),
    );
    group.set(
        Attribute::uri("printer-uri", "ipp://localhost:631/printers/jukebox").expect("uri"),
    );
    if let Some(name) = job_name {
        group.set(Attribute::name("job-name", name).expect("job-name"));
    }
    msg.push_group(group);
    msg.set_data(document.to_vec());
    msg.pack()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_parse_request(c: &mut Criterion) {
    let data = build_request(Operation::GetPrinterAttributes, 42, None, &[]);

    c.bench_function("parse request (minimal)", |b| {
        b.iter(|| {
            let result = Message::parse(black_box(&data));
            assert!(result.is_ok());
        });
    });

    let doc = vec![0xABu8; 64 * 1024];
    let with_doc = build_request(Operation::PrintJob, 100, Some("Benchmark Track"), &doc);

    c.bench_function("parse request (64 KiB document)", |b| {
        b.iter(|| {
            let result = Message::parse(black_box(&with_doc));
            assert!(result.is_ok());
        });
    });
}

fn bench_pack_response(c: &mut Criterion) {
    c.bench_function("pack response (printer attrs)", |b| {
        b.iter(|| {
            let mut msg = Message::response(IppVersion::V1_1, StatusCode::SuccessfulOk, black_box(1))
                .expect("response");
            let mut printer = AttributeGroup::new(GroupTag::Printer);
            printer.set(Attribute::name("printer-name", "jukebox").expect("attr"));
            printer.set(Attribute::enumeration("printer-state", 3).expect("attr"));
            printer.set(
                Attribute::uri("printer-uri-supported", "ipp://localhost:631/printers/jukebox")
                    .expect("attr"),
            );
            printer.set(
                Attribute::mime_media_types(
                    "document-format-supported",
                    ["audio/mpeg", "audio/ogg", "application/octet-stream"],
                )
                .expect("attr"),
            );
            printer.set(
                Attribute::enumerations("operations-supported", [0x0002, 0x000a, 0x000b])
                    .expect("attr"),
            );
            printer.set(Attribute::boolean("printer-is-accepting-jobs", true).expect("attr"));
            printer.set(Attribute::single("printer-up-time", Value::integer(86400)).expect("attr"));
            msg.push_group(printer);
            black_box(msg.pack());
        });
    });
}

criterion_group!(benches, bench_parse_request, bench_pack_response);
criterion_main!(benches);
