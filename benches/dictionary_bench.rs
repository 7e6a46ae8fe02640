use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use keyed_dict::ByteDictionary;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> Vec<u8> {
    format!("k{:016x}", n).into_bytes()
}

// Precompute `count` random picks out of `items` using a second LCG.
fn pick<T: Clone>(items: &[T], count: usize) -> Vec<T> {
    let n = items.len();
    let mut s = 0x9e3779b97f4a7c15u64;
    (0..count)
        .map(|_| {
            s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
            items[(s as usize) % n].clone()
        })
        .collect()
}

fn filled(seed: u64, n: usize) -> (ByteDictionary<u64>, Vec<Vec<u8>>) {
    let mut d = ByteDictionary::new();
    let keys: Vec<_> = lcg(seed).take(n).map(key).collect();
    for (i, k) in keys.iter().enumerate() {
        d.insert_bytes(k, i as u64);
    }
    (d, keys)
}

fn bench_insert_fresh_100k(c: &mut Criterion) {
    c.bench_function("bytes::insert_fresh_100k", |b| {
        b.iter_batched(
            ByteDictionary::<u64>::new,
            |mut d| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    d.insert_bytes(&key(x), i as u64);
                }
                black_box(d)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_recycled_100k(c: &mut Criterion) {
    c.bench_function("bytes::insert_into_free_list_100k", |b| {
        b.iter_batched(
            || {
                // Pre-grow, then empty through removals so inserts pop the free list.
                let (mut d, keys) = filled(2, 110_000);
                for k in &keys {
                    d.remove_bytes(k);
                }
                d
            },
            |mut d| {
                for (i, x) in lcg(3).take(100_000).enumerate() {
                    d.insert_bytes(&key(x), i as u64);
                }
                black_box(d)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_remove_random_10k(c: &mut Criterion) {
    c.bench_function("bytes::remove_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let (d, keys) = filled(5, 110_000);
                let to_remove = pick(&keys, 10_000);
                (d, to_remove)
            },
            |(mut d, to_remove)| {
                for k in &to_remove {
                    black_box(d.remove_bytes(k));
                }
                black_box(d)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_lookup(c: &mut Criterion) {
    let (d, keys) = filled(7, 100_000);
    let hits = pick(&keys, 10_000);
    c.bench_function("bytes::view_hit_10k_on_100k", |b| {
        b.iter(|| {
            for k in &hits {
                black_box(d.get_bytes(k));
            }
        })
    });

    let owned: Vec<Box<[u8]>> = hits.iter().map(|k| Box::from(&k[..])).collect();
    c.bench_function("bytes::owned_hit_10k_on_100k", |b| {
        b.iter(|| {
            for k in &owned {
                black_box(d.get(k));
            }
        })
    });

    c.bench_function("bytes::view_miss_10k_on_100k", |b| {
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            for _ in 0..10_000 {
                let k = key(miss.next().unwrap_or_default());
                black_box(d.get_bytes(&k));
            }
        })
    });
}

fn bench_enumeration(c: &mut Criterion) {
    let (d, _) = filled(999, 100_000);
    c.bench_function("bytes::iter_all_100k", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for (_k, v) in d.iter() {
                sum = sum.wrapping_add(*v);
            }
            black_box(sum)
        })
    });

    c.bench_function("bytes::versioned_enumerator_all_100k", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            let mut e = d.enumerator();
            while let Ok(true) = e.move_next(&d) {
                if let Some((_k, v)) = e.current(&d) {
                    sum = sum.wrapping_add(*v);
                }
            }
            black_box(sum)
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_insert;
    config = bench_config();
    targets = bench_insert_fresh_100k, bench_insert_recycled_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_remove_random_10k,
              bench_lookup,
              bench_enumeration
}
criterion_main!(benches_insert, benches_ops);
