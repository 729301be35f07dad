use chained_hashmap::ChainedHashMap;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn bench_insert(c: &mut Criterion) {
    let keys: Vec<_> = lcg(1).take(10_000).map(key).collect();
    c.bench_function("chained_hashmap_insert_10k", |b| {
        b.iter_batched(
            ChainedHashMap::<u64>::new,
            |mut m| {
                for (i, k) in keys.iter().enumerate() {
                    m.put(k, i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_presized(c: &mut Criterion) {
    let keys: Vec<_> = lcg(1).take(10_000).map(key).collect();
    c.bench_function("chained_hashmap_insert_10k_presized", |b| {
        b.iter_batched(
            || ChainedHashMap::<u64>::with_capacity(16_384).unwrap(),
            |mut m| {
                for (i, k) in keys.iter().enumerate() {
                    m.put(k, i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("chained_hashmap_get_hit", |b| {
        let mut m = ChainedHashMap::new();
        let keys: Vec<_> = lcg(7).take(20_000).map(key).collect();
        for (i, k) in keys.iter().enumerate() {
            m.put(k, i as u64).unwrap();
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(m.get(k).unwrap());
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("chained_hashmap_get_miss", |b| {
        let mut m = ChainedHashMap::new();
        for (i, x) in lcg(11).take(10_000).enumerate() {
            m.put(&key(x), i as u64).unwrap();
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            // generate keys unlikely in map
            let k = key(miss.next().unwrap());
            black_box(m.get(&k));
        })
    });
}

fn bench_overwrite(c: &mut Criterion) {
    c.bench_function("chained_hashmap_overwrite_with_cleanup", |b| {
        let mut m = ChainedHashMap::with_cleanup(0, |v: u64| {
            black_box(v);
        })
        .unwrap();
        let keys: Vec<_> = lcg(3).take(1_000).map(key).collect();
        for k in &keys {
            m.put(k, 0).unwrap();
        }
        let mut it = keys.iter().cycle();
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            m.put(it.next().unwrap(), n).unwrap();
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert, bench_insert_presized, bench_get_hit, bench_get_miss, bench_overwrite
}
criterion_main!(benches);
