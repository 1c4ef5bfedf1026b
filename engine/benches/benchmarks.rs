//! Performance benchmarks for synctab-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use synctab_engine::{CleartextPayload, Envelope, HistoryPayload, RecordPayload};

fn history_payload(visits: usize) -> String {
    let visits: Vec<_> = (0..visits)
        .map(|i| json!({"date": 1_706_745_600_000_000u64 + i as u64, "type": 1}))
        .collect();
    json!({
        "id": "abcdefghijkl",
        "histUri": "https://example.com/some/page",
        "title": "Example page",
        "visits": visits,
    })
    .to_string()
}

fn wire_record(payload: &str) -> String {
    json!({
        "id": "abcdefghijkl",
        "collection": "history",
        "payload": payload,
        "sortindex": 100,
        "modified": 1706745600.25,
    })
    .to_string()
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");
    let raw = wire_record(&history_payload(10));

    group.bench_function("parse", |b| b.iter(|| Envelope::parse(black_box(&raw))));

    group.bench_function("parse_and_validate", |b| {
        b.iter(|| {
            let env = Envelope::parse(black_box(&raw));
            env.is_valid() && env.modified() > 0
        })
    });

    let env = Envelope::parse(&raw);
    group.bench_function("with_modified", |b| {
        b.iter(|| env.with_modified(black_box(1_706_745_700_000)))
    });

    group.bench_function("serialize", |b| b.iter(|| env.to_json_string()));

    group.finish();
}

fn bench_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload");

    for visits in [0usize, 10, 100] {
        let raw = history_payload(visits);
        group.bench_with_input(BenchmarkId::new("cleartext", visits), &raw, |b, raw| {
            b.iter(|| CleartextPayload::parse(black_box(raw)).is_valid())
        });
        group.bench_with_input(BenchmarkId::new("history", visits), &raw, |b, raw| {
            b.iter(|| {
                let payload = HistoryPayload::parse(black_box(raw));
                payload.is_valid() && !payload.visits().is_empty()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_envelope, bench_payload);
criterion_main!(benches);
