use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vaultcache::core::clock;
use vaultcache::core::config::KeyedConfig;
use vaultcache::core::keyed::KeyedCache;
use vaultcache::core::snapshot::digest;
use vaultcache::core::store::{CacheStore, SnapshotFile};
use vaultcache::core::types::SecretMap;

/// Generate a secret set with `count` entries of `value_len` bytes.
fn generate_secrets(count: usize, value_len: usize) -> SecretMap {
    (0..count)
        .map(|i| (format!("SECRET_{}", i), "x".repeat(value_len)))
        .collect()
}

/// Benchmark the snapshot digest over varying secret counts.
fn bench_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest");
    group.sample_size(50);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for count in [10, 100, 1000] {
        let data = generate_secrets(count, 64);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("sha256", count), &data, |b, data| {
            b.iter(|| black_box(digest(black_box(data)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark verified reads and persisted updates on the snapshot store.
fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");
    group.sample_size(30);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    let tmp = TempDir::new().unwrap();
    let store = CacheStore::with_parts(
        SnapshotFile::new(tmp.path().join("cache.json")),
        None,
        Duration::from_secs(3600),
        clock::system(),
    );
    let data = generate_secrets(100, 64);
    store.update(data.clone(), "bench").unwrap();

    group.bench_function("get", |b| {
        b.iter(|| black_box(store.get()));
    });
    group.bench_function("update", |b| {
        b.iter(|| black_box(store.update(data.clone(), "bench").unwrap()));
    });

    group.finish();
}

/// Benchmark keyed cache hits and inserts.
fn bench_keyed(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed");
    group.sample_size(50);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    let cache: Arc<KeyedCache<String>> =
        Arc::new(KeyedCache::new(&KeyedConfig::default(), clock::system()));
    for i in 0..1000 {
        cache.set(&format!("key-{}", i), i.to_string()).unwrap();
    }

    group.bench_function("try_get_hit", |b| {
        b.iter(|| black_box(cache.try_get(black_box("KEY-500"))));
    });
    group.bench_function("try_get_miss", |b| {
        b.iter(|| black_box(cache.try_get(black_box("absent"))));
    });
    group.bench_function("set", |b| {
        b.iter(|| cache.set(black_box("key-1"), "value".to_string()).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_digest, bench_store, bench_keyed);
criterion_main!(benches);
