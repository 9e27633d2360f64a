#![cfg(all(feature = "criterion-bench", feature = "memory-service"))]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures::executor::block_on;
use rs_rental::{
    IdentityId, MemoryResourceService, Resource, ResourceCache, ResourceId, ResourceStatus,
    filter_resources,
};
use std::hint::black_box;

const STREETS: [&str; 4] = ["Main St", "Oak Ave", "Quai Ouest", "Rue Haute"];

fn listing(count: usize, owner: &IdentityId) -> Vec<Resource> {
    (0..count)
        .map(|i| Resource {
            id: ResourceId::try_from(format!("prop_{i}")).unwrap(),
            title: format!("Apartment {i}"),
            address: format!("{} {}", i % 200, STREETS[i % STREETS.len()]),
            price: 500.0 + (i % 40) as f64 * 25.0,
            status: ResourceStatus::Available,
            image_url: None,
            owner_id: owner.clone(),
        })
        .collect()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_resources");
    group.sample_size(30);

    let owner = IdentityId::try_from("owner_bench").unwrap();
    for count in [10usize, 100, 1_000, 10_000] {
        let resources = listing(count, &owner);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("blank_query", count), &count, |b, _| {
            b.iter(|| black_box(filter_resources(&resources, "   ").len()));
        });
        group.bench_with_input(BenchmarkId::new("address_match", count), &count, |b, _| {
            b.iter(|| black_box(filter_resources(&resources, "MAIN").len()));
        });
        group.bench_with_input(BenchmarkId::new("no_match", count), &count, |b, _| {
            b.iter(|| black_box(filter_resources(&resources, "penthouse").len()));
        });
    }

    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("resource_cache");
    group.sample_size(30);

    let owner = IdentityId::try_from("owner_bench").unwrap();
    let service = MemoryResourceService::new();
    for resource in listing(1_000, &owner) {
        service.insert(resource);
    }
    let cache = ResourceCache::new(service);
    block_on(cache.fetch(Some(&owner))).unwrap();

    group.throughput(Throughput::Elements(1));
    group.bench_function("fetch_1000", |b| {
        b.iter(|| black_box(block_on(cache.fetch(Some(&owner)))).unwrap());
    });
    group.bench_function("query_then_filtered", |b| {
        b.iter(|| {
            cache.set_query("oak");
            black_box(cache.filtered().len())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_filter, bench_cache);
criterion_main!(benches);
