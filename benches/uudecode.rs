//! Benchmarks for article body processing
//!
//! Inline uuencode extraction runs on every archived body, as does truncation of
//! quoted replies.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nntp_archiver::truncate_text;
use nntp_archiver::uuencode::{decode_line, encode, extract_inline_attachments};

/// Article body with one embedded file of `size` bytes
fn generate_body(size: usize) -> String {
    let data: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
    format!(
        "Here is the file you asked for.\n\n{}\n\nEnjoy!\n",
        encode(&data, "payload.bin", "644")
    )
}

/// Reply quoting the same paragraph at several depths
fn generate_reply(lines: usize) -> String {
    let mut body = String::new();
    for i in 0..lines {
        let depth = 1 + i % 3;
        body.push_str(&">".repeat(depth));
        body.push_str(" the quick brown fox jumps over the lazy dog once more\n");
        if i % 10 == 9 {
            body.push_str("A fresh remark between the quotes.\n");
        }
    }
    body
}

fn bench_decode_line(c: &mut Criterion) {
    let line = "M5&AE('%U:6-K(&)R;W=N(&9O>\"!J=6UP<R!O=F5R('1H92!L87IY(&1O9R`N";
    c.bench_function("uudecode_line", |b| {
        b.iter(|| decode_line(black_box(line)));
    });
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("uudecode_extract");

    for size in [1_024, 10_240, 102_400, 1_024_000].iter() {
        let body = generate_body(*size);
        group.throughput(Throughput::Bytes(body.len() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}KB", size / 1024)),
            size,
            |b, _| {
                b.iter(|| extract_inline_attachments(black_box(&body)));
            },
        );
    }

    group.finish();
}

fn bench_truncate_reply(c: &mut Criterion) {
    let mut group = c.benchmark_group("truncate_reply");

    for lines in [50, 500, 5_000].iter() {
        let body = generate_reply(*lines);
        group.throughput(Throughput::Bytes(body.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(lines), lines, |b, _| {
            b.iter(|| truncate_text(black_box(&body), false));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode_line, bench_extract, bench_truncate_reply);
criterion_main!(benches);
