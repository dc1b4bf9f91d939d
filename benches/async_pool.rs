use std::convert::TryInto;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use respool::executor::Executor;
use respool::r#async::Pool;
use respool::runtime::{TokioExecutor, TokioTimer};

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

#[tokio::main]
async fn bench_get(cfg: Config) {
    let pool = Pool::<u32>::builder(cfg.pool_size)
        .timer(Arc::new(TokioTimer::current()))
        .build()
        .unwrap();
    let executor: Arc<dyn Executor> = Arc::new(TokioExecutor::current());
    let join_handles: Vec<_> = (0..cfg.workers)
        .map(|_| {
            let pool = pool.clone();
            let executor = executor.clone();
            tokio::spawn(async move {
                for _ in 0..cfg.operations_per_worker() {
                    let _ = pool.get_future(executor.clone(), Duration::from_secs(1)).await;
                }
            })
        })
        .collect();
    for join_handle in join_handles {
        join_handle.await.unwrap();
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_pool");
    group.throughput(criterion::Throughput::Elements(
        ITERATIONS.try_into().expect("can't convert usize to u64"),
    ));
    for &config in CONFIGS {
        group.bench_with_input(BenchmarkId::new("get", config), &config, |b, &cfg| {
            b.iter(|| bench_get(cfg))
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
