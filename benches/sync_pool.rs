use std::fmt::Display;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use respool::sync::Pool;

const ITERATIONS: usize = 1 << 15;

#[derive(Copy, Clone, Debug)]
struct Config {
    pool_size: usize,
    workers: usize,
}

impl Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}s{}", self.workers, self.pool_size)
    }
}

impl Config {
    fn operations_per_worker(&self) -> usize {
        ITERATIONS / self.workers
    }
}

#[rustfmt::skip]
const CONFIGS: &[Config] = &[
    // 8 workers
    Config { workers:  8, pool_size:  2 },
    Config { workers:  8, pool_size:  4 },
    Config { workers:  8, pool_size:  8 },
    // 16 workers
    Config { workers: 16, pool_size:  4 },
    Config { workers: 16, pool_size:  8 },
    Config { workers: 16, pool_size: 16 },
];

fn bench_get(cfg: Config) {
    let pool = Arc::new(Pool::<u32>::builder(cfg.pool_size).build().unwrap());
    let handles: Vec<_> = (0..cfg.workers)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                for _ in 0..cfg.operations_per_worker() {
                    if let Ok(mut handle) = pool.get_auto_recycle(Duration::from_secs(1)) {
                        let _ = handle.reset(0);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_pool");
    group.throughput(criterion::Throughput::Elements(ITERATIONS as u64));
    for &config in CONFIGS {
        group.bench_with_input(BenchmarkId::new("get", config), &config, |b, &cfg| {
            b.iter(|| bench_get(cfg))
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
