//! Benchmarks for catalog persistence
//!
//! Each iteration snapshots the map and replaces the catalog file.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pixelforge::activity::LogSink;
use pixelforge::catalog::CatalogStore;
use pixelforge_common::ImageFormat;
use std::sync::Arc;

fn store_with(rt: &tokio::runtime::Runtime, dir: &std::path::Path, records: usize) -> Arc<CatalogStore> {
    let path = dir.join("imginfo.json");
    CatalogStore::init_file(&path).unwrap();
    let store = CatalogStore::load(&path, dir.join("images"), LogSink::new(dir.join("log.txt")))
        .unwrap();

    let _guard = rt.enter();
    for i in 0..records {
        store.upsert(&format!("blur_image_{i:05}.png"), ImageFormat::Png, "blur");
    }
    rt.block_on(store.settle());
    store
}

fn bench_persist(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("catalog_persist");

    for records in [10, 100, 1000] {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&rt, dir.path(), records);
        group.bench_with_input(BenchmarkId::from_parameter(records), &store, |b, store| {
            b.iter(|| store.persist().unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_persist);
criterion_main!(benches);
