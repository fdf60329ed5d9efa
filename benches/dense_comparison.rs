use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;

use bytemuck::Zeroable;
use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use dense_hash::HashTable as DenseHashTable;
use hashbrown::hash_table::Entry as HashbrownEntry;
use hashbrown::hash_table::HashTable as HashbrownHashTable;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::distr;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

trait BenchValue: Copy + Zeroable {
    fn new(key: u64) -> Self;
    fn weight(&self) -> u64;
}

#[derive(Clone, Copy, Zeroable)]
struct SmallValue {
    value: u64,
}

impl BenchValue for SmallValue {
    fn new(key: u64) -> Self {
        black_box(Self { value: key })
    }

    fn weight(&self) -> u64 {
        self.value
    }
}

#[derive(Clone, Copy, Zeroable)]
struct LargeValue {
    bytes: [u8; 256],
}

impl BenchValue for LargeValue {
    fn new(key: u64) -> Self {
        let mut bytes = [0u8; 256];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = ((key >> ((i % 8) * 8)) & 0xFF) as u8;
        }
        black_box(Self { bytes })
    }

    fn weight(&self) -> u64 {
        self.bytes[0] as u64
    }
}

fn hash_key(key: u64) -> u64 {
    let mut hasher = SipHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 11),
    (1 << 12),
    (1 << 13),
    (1 << 14),
    (1 << 15),
    (1 << 16),
    (1 << 17),
    (1 << 18),
];

fn random_keys(count: usize) -> Vec<(u64, u64)> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| {
            let key = rng.try_next_u64().unwrap();
            (hash_key(key), key)
        })
        .collect()
}

fn filled_dense<V: BenchValue>(keys: &[(u64, u64)]) -> DenseHashTable<u64, V> {
    let mut table = DenseHashTable::with_capacity(keys.len() + 1).unwrap();
    for &(hash, key) in keys {
        table.set(hash, key, V::new(key));
    }
    table
}

fn filled_hashbrown<V: BenchValue>(keys: &[(u64, u64)]) -> HashbrownHashTable<(u64, V)> {
    let mut table = HashbrownHashTable::with_capacity(keys.len());
    for &(hash, key) in keys {
        table.insert_unique(hash, (key, V::new(key)), |(k, _)| hash_key(*k));
    }
    table
}

fn bench_insert_random<V: BenchValue, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_{}",
        core::any::type_name::<V>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("dense_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut table = DenseHashTable::<u64, V>::with_capacity(0).unwrap();
                    for (hash, key) in keys {
                        black_box(table.set(hash, key, V::new(key)));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut table = HashbrownHashTable::<(u64, V)>::with_capacity(0);
                    for (hash, key) in keys {
                        match table.entry(hash, |(k, _)| *k == key, |(k, _)| hash_key(*k)) {
                            HashbrownEntry::Vacant(entry) => {
                                black_box(entry.insert((key, V::new(key))));
                            }
                            HashbrownEntry::Occupied(mut entry) => {
                                entry.get_mut().1 = V::new(key);
                            }
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit_miss<V: BenchValue, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "find_hit_miss_{}",
        core::any::type_name::<V>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys(size);
        let mut probes = keys.clone();
        probes.extend(random_keys(size));
        probes.shuffle(&mut SmallRng::from_os_rng());

        let dense = filled_dense::<V>(&keys);
        let hashbrown = filled_hashbrown::<V>(&keys);
        group.throughput(Throughput::Elements(probes.len() as u64));

        group.bench_function(format!("dense_hash/{size}"), |b| {
            b.iter(|| {
                for (hash, key) in probes.iter() {
                    black_box(dense.try_get(*hash, key));
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for (hash, key) in probes.iter() {
                    black_box(hashbrown.find(*hash, |(k, _)| k == key));
                }
            })
        });
    }

    group.finish();
}

fn bench_remove<V: BenchValue, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("remove_{}", core::any::type_name::<V>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys(size);
        let dense = filled_dense::<V>(&keys);
        let hashbrown = filled_hashbrown::<V>(&keys);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("dense_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    (dense.clone(), keys)
                },
                |(mut table, keys)| {
                    for (hash, key) in keys {
                        black_box(table.remove(hash, &key));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    (hashbrown.clone(), keys)
                },
                |(mut table, keys)| {
                    for (hash, key) in keys {
                        if let Ok(entry) = table.find_entry(hash, |(k, _)| *k == key) {
                            black_box(entry.remove().0);
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Sums every value, which is the access pattern dense storage exists for.
fn bench_iteration<V: BenchValue, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("iteration_{}", core::any::type_name::<V>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys(size);
        let mut dense = filled_dense::<V>(&keys);
        let mut hashbrown = filled_hashbrown::<V>(&keys);

        // Punch holes so both tables have seen removals.
        for (hash, key) in keys.iter().step_by(3) {
            dense.remove(*hash, key);
            if let Ok(entry) = hashbrown.find_entry(*hash, |(k, _)| k == key) {
                entry.remove();
            }
        }
        group.throughput(Throughput::Elements(dense.len() as u64));

        group.bench_function(format!("dense_hash/{size}"), |b| {
            b.iter(|| {
                black_box(
                    dense
                        .values()
                        .iter()
                        .fold(0u64, |acc, v| acc.wrapping_add(v.weight())),
                )
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                black_box(
                    hashbrown
                        .iter()
                        .fold(0u64, |acc, (_, v)| acc.wrapping_add(v.weight())),
                )
            })
        });
    }

    group.finish();
}

#[derive(Clone, Copy)]
enum Operation {
    Insert,
    Remove,
    Find,
}

const KEY_SPACE_MULTIPLIER: usize = 2;

fn bench_mixed_zipf<V: BenchValue, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("mixed_zipf_{}", core::any::type_name::<V>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let mut rng = SmallRng::from_os_rng();
        let operations = (0..size * 3)
            .map(|_| {
                let op_choice: f64 = rng.sample(distr::Uniform::new(0.0, 1.0).unwrap());
                if op_choice < 0.5 {
                    Operation::Find
                } else if op_choice < 0.75 {
                    Operation::Insert
                } else {
                    Operation::Remove
                }
            })
            .collect::<Vec<Operation>>();

        let insert_distr = Zipf::new(size as f32 - 1.0, 1.0).unwrap();
        let find_remove_distr =
            Zipf::new(size as f32 * KEY_SPACE_MULTIPLIER as f32 - 1.0, 1.0).unwrap();
        group.throughput(Throughput::Elements(operations.len() as u64));

        group.bench_function(format!("dense_hash/{size}"), |b| {
            b.iter_batched(
                || SmallRng::from_os_rng(),
                |mut rng| {
                    let mut table = DenseHashTable::<u64, V>::with_capacity(0).unwrap();
                    for operation in operations.iter() {
                        match operation {
                            Operation::Insert => {
                                let key = rng.sample(insert_distr) as u64;
                                black_box(table.set(hash_key(key), key, V::new(key)));
                            }
                            Operation::Remove => {
                                let key = rng.sample(find_remove_distr) as u64;
                                black_box(table.remove(hash_key(key), &key));
                            }
                            Operation::Find => {
                                let key = rng.sample(find_remove_distr) as u64;
                                black_box(table.try_get(hash_key(key), &key));
                            }
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || SmallRng::from_os_rng(),
                |mut rng| {
                    let mut table = HashbrownHashTable::<(u64, V)>::with_capacity(0);
                    for operation in operations.iter() {
                        match operation {
                            Operation::Insert => {
                                let key = rng.sample(insert_distr) as u64;
                                let hash = hash_key(key);
                                match table.entry(hash, |(k, _)| *k == key, |(k, _)| hash_key(*k))
                                {
                                    HashbrownEntry::Vacant(entry) => {
                                        black_box(entry.insert((key, V::new(key))));
                                    }
                                    HashbrownEntry::Occupied(mut entry) => {
                                        entry.get_mut().1 = V::new(key);
                                    }
                                }
                            }
                            Operation::Remove => {
                                let key = rng.sample(find_remove_distr) as u64;
                                let result =
                                    match table.find_entry(hash_key(key), |(k, _)| *k == key) {
                                        Ok(entry) => Some(entry.remove().0),
                                        Err(_) => None,
                                    };
                                black_box(result);
                            }
                            Operation::Find => {
                                let key = rng.sample(find_remove_distr) as u64;
                                black_box(table.find(hash_key(key), |(k, _)| *k == key));
                            }
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallValue, 8>,
    bench_insert_random::<LargeValue, 5>,
    bench_find_hit_miss::<SmallValue, 8>,
    bench_find_hit_miss::<LargeValue, 5>,
    bench_remove::<SmallValue, 8>,
    bench_remove::<LargeValue, 5>,
    bench_iteration::<SmallValue, 8>,
    bench_iteration::<LargeValue, 5>,
    bench_mixed_zipf::<SmallValue, 8>,
    bench_mixed_zipf::<LargeValue, 5>,
);

criterion_main!(benches);
