//! Delivery planning benchmarks
//!
//! Run with: cargo bench --bench chunking

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use heartwire::channels::{chunk_text, TEXT_CHUNK_LIMIT};
use heartwire::heartbeat::{normalize_reply, plan_delivery};
use heartwire::reply::ReplyPayload;

fn benchmark_chunk_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_text");

    for size in [1_000usize, 10_000, 100_000].iter() {
        let prose = "The nightly backup finished with warnings.\n".repeat(size / 43 + 1);
        let unbroken = "x".repeat(*size);
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(format!("prose_{}", size), &prose, |b, text| {
            b.iter(|| chunk_text(black_box(text), TEXT_CHUNK_LIMIT));
        });
        group.bench_with_input(format!("unbroken_{}", size), &unbroken, |b, text| {
            b.iter(|| chunk_text(black_box(text), TEXT_CHUNK_LIMIT));
        });
    }

    group.finish();
}

fn benchmark_normalize_and_plan(c: &mut Criterion) {
    let payload = ReplyPayload::text(format!("HEARTBEAT_OK {}", "Inbox: 3 unread. ".repeat(500)));

    c.bench_function("normalize_and_plan", |b| {
        b.iter(|| {
            let normalized = normalize_reply(black_box(&payload), Some("[bot]"));
            plan_delivery(&normalized.text, &[])
        });
    });
}

criterion_group!(benches, benchmark_chunk_text, benchmark_normalize_and_plan);
criterion_main!(benches);
