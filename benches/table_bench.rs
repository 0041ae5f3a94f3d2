//! Simple store/fetch/traversal throughput benches. Here to quickly test
//! for regressions.

use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rand::{Rng, rng};

use nibblehash::Table;

fn gen_keys(count: usize) -> Vec<Vec<u8>> {
    let mut rng = rng();
    (0..count)
        .map(|i| {
            let mut key = format!("bench-key-{i}-").into_bytes();
            key.extend((0..rng.random_range(0..12)).map(|_| rng.random::<u8>()));
            key
        })
        .collect()
}

pub fn rand_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("rand_store");
    group.throughput(Throughput::Elements(1));

    let keys = gen_keys(1 << 16);

    group.bench_function("insert_and_replace", |b| {
        let mut table = Table::new();
        let mut rng = rng();
        b.iter(|| {
            let key = &keys[rng.random_range(0..keys.len())];
            table.store(key, key, 0).unwrap();
        })
    });

    group.finish();
}

pub fn rand_fetch(c: &mut Criterion) {
    let mut group = c.benchmark_group("rand_fetch");
    group.throughput(Throughput::Elements(1));

    let keys = gen_keys(1 << 16);
    let mut table = Table::new();
    for key in &keys {
        table.store(key, key, 0).unwrap();
    }

    group.bench_function("hit", |b| {
        let mut rng = rng();
        b.iter(|| {
            let key = &keys[rng.random_range(0..keys.len())];
            black_box(table.fetch(key).unwrap());
        })
    });

    group.bench_function("miss", |b| {
        let mut rng = rng();
        b.iter(|| {
            let key: [u8; 12] = rng.random();
            black_box(table.fetch(&key).ok());
        })
    });

    group.finish();
}

pub fn traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("traversal");

    let keys = gen_keys(1 << 12);
    let mut table = Table::new();
    for key in &keys {
        table.store(key, key, 0).unwrap();
    }
    group.throughput(Throughput::Elements(keys.len() as u64));

    group.bench_function("full_keys_walk", |b| {
        b.iter(|| {
            black_box(table.keys().count());
        })
    });

    group.finish();
}

criterion_group!(benches, rand_store, rand_fetch, traversal);
criterion_main!(benches);
