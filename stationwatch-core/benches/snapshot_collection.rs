use chrono::{TimeDelta, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use stationwatch_core::{StationStore, Zone};

/// Benchmark snapshot() with varying station counts
fn bench_snapshot_varying_stations(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_varying_stations");
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();

    for station_count in [1, 10, 50, 200].iter() {
        let store = StationStore::builder().zone(Zone::utc()).build();

        // one reading per station per minute for two hours
        for i in 0..*station_count {
            let station_id = format!("station-{}", i);
            for minute in 0..120 {
                store
                    .ingest(
                        &station_id,
                        &json!(15.0 + minute as f64 / 10.0),
                        &json!(60),
                        &json!(null),
                        start + TimeDelta::minutes(minute),
                    )
                    .unwrap();
            }
        }

        let now = start + TimeDelta::minutes(120);
        group.bench_with_input(
            BenchmarkId::from_parameter(station_count),
            station_count,
            |b, _| {
                b.iter(|| {
                    black_box(store.snapshot(now));
                });
            },
        );
    }
    group.finish();
}

/// Benchmark snapshot() on a station with a full recent buffer
fn bench_snapshot_full_buffer(c: &mut Criterion) {
    let store = StationStore::builder().zone(Zone::utc()).build();
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();

    for i in 0..2000 {
        store
            .ingest("station-1", &json!(20.0), &json!(50.0), &json!(null), start + TimeDelta::milliseconds(i * 150))
            .unwrap();
    }

    let now = start + TimeDelta::seconds(300);
    c.bench_function("snapshot_full_buffer", |b| {
        b.iter(|| {
            black_box(store.snapshot(now));
        });
    });
}

criterion_group!(
    benches,
    bench_snapshot_varying_stations,
    bench_snapshot_full_buffer,
);
criterion_main!(benches);
