//! Per-user recommendation latency benchmarks
//!
//! Dataset: 400 households x 3,000 products, ~30 purchases each, seeded so
//! runs are comparable.
//!
//! Targets:
//! - Content-based: well under 10ms per user
//! - User-user (after fit): <1ms per user
//! - Item-item: <20ms per user across all batches

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shelfwise_core::{
    build_recommender, Algorithm, Dataset, Deadline, EngineConfig, MatrixBuilder,
    ProductAttributes, Transaction, UserUserRecommender,
};
use std::sync::Arc;

const HOUSEHOLDS: u64 = 400;
const PRODUCTS: u64 = 3_000;
const PURCHASES_PER_HOUSEHOLD: usize = 30;

fn generate_dataset(config: &EngineConfig) -> Arc<Dataset> {
    let mut rng = StdRng::seed_from_u64(42);

    let products: Vec<ProductAttributes> = (1..=PRODUCTS)
        .map(|id| {
            ProductAttributes::new(
                id,
                format!("DEPT {}", id % 12),
                format!("COMMODITY {}", id % 150),
                format!("SUB {}", id % 600),
                format!("MFR {}", id % 400),
                if id % 3 == 0 { "Private" } else { "National" },
            )
        })
        .collect();

    let mut transactions = Vec::new();
    for household in 1..=HOUSEHOLDS {
        for _ in 0..PURCHASES_PER_HOUSEHOLD {
            // Skew toward low ids so popular products exist
            let product = (rng.gen::<f64>().powi(2) * PRODUCTS as f64) as u64 + 1;
            let week = rng.gen_range(1..=26);
            let value = rng.gen_range(0.5..25.0);
            transactions.push(Transaction::new(household, product.min(PRODUCTS), week, value, 1.0));
        }
    }

    Arc::new(
        MatrixBuilder::new(config)
            .build(&transactions, &products)
            .unwrap(),
    )
}

fn bench_recommend_per_user(c: &mut Criterion) {
    let config = EngineConfig::default();
    let dataset = generate_dataset(&config);
    let households: Vec<u64> = dataset.train.households().take(50).collect();

    let mut group = c.benchmark_group("recommend_per_user");
    group.throughput(Throughput::Elements(households.len() as u64));

    for algorithm in Algorithm::ALL {
        let recommender = build_recommender(algorithm, dataset.clone(), &config);
        group.bench_with_input(
            BenchmarkId::from_parameter(algorithm),
            &households,
            |b, households| {
                b.iter(|| {
                    for &household in households {
                        let list = recommender
                            .recommend(black_box(household), 10, &Deadline::none())
                            .unwrap();
                        black_box(list);
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_user_similarity_fit(c: &mut Criterion) {
    let config = EngineConfig::default();
    let dataset = generate_dataset(&config);

    c.bench_function("user_user_fit", |b| {
        b.iter(|| {
            let recommender =
                UserUserRecommender::fit(black_box(dataset.clone()), config.user_user.clone());
            black_box(recommender);
        });
    });
}

fn bench_item_batch_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("item_item_batch_size");
    for batch_size in [250usize, 1_000, 5_000] {
        let mut config = EngineConfig::default();
        config.item_item.batch_size = batch_size;
        let dataset = generate_dataset(&config);
        let household = dataset.train.households().next().unwrap_or(1);
        let recommender = build_recommender(Algorithm::ItemItem, dataset, &config);

        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &household, |b, &h| {
            b.iter(|| black_box(recommender.recommend(h, 10, &Deadline::none()).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_recommend_per_user,
    bench_user_similarity_fit,
    bench_item_batch_size
);
criterion_main!(benches);
