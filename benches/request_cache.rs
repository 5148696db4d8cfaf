//! Benchmarks for the caching layer
//!
//! This benchmark measures:
//! - Request key normalization and hashing
//! - LRU get/set throughput under eviction pressure
//! - Request cache hit path

use ai_gen_pipeline::cache::{BoundedCache, CacheKey, RequestCache, RequestKind};
use ai_gen_pipeline::generation::{GenerationOptions, GenerationRequest, Tone};
use ai_gen_pipeline::Error;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

fn bench_cache_key(c: &mut Criterion) {
    let request = GenerationRequest::new("  Remote Work Tips for Distributed Teams ")
        .with_research(true)
        .with_options(
            GenerationOptions::default()
                .with_tone(Tone::Friendly)
                .with_keywords(["async", "Remote", "focus", "remote"]),
        );

    c.bench_function("cache_key_for_request", |b| {
        b.iter(|| CacheKey::for_request(black_box(&request)))
    });
}

fn bench_lru(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounded_cache");
    for capacity in [16usize, 256, 4096] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("set_get", capacity),
            &capacity,
            |b, &capacity| {
                let cache: BoundedCache<u64, u64> = BoundedCache::new(capacity);
                let mut i = 0u64;
                b.iter(|| {
                    cache.set(i, i);
                    black_box(cache.get(&(i / 2)));
                    i += 1;
                })
            },
        );
    }
    group.finish();
}

fn bench_request_cache_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let cache: RequestCache<String> = RequestCache::new(Duration::from_secs(3600));
    let key = CacheKey::new(RequestKind::Article, "bench");
    rt.block_on(async {
        cache
            .get_or_compute(key.clone(), || async { Ok::<_, Error>("value".to_string()) })
            .await
            .expect("warm cache");
    });

    let cache = &cache;
    let key = &key;
    c.bench_function("request_cache_hit", |b| {
        b.to_async(&rt).iter(|| async move {
            cache
                .get_or_compute(key.clone(), || async { Ok::<_, Error>(String::new()) })
                .await
        })
    });
}

criterion_group!(benches, bench_cache_key, bench_lru, bench_request_cache_hit);
criterion_main!(benches);
