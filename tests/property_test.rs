//! Property tests over randomly generated purchase histories

mod common;

use common::*;
use proptest::prelude::*;
use shelfwise_core::{
    build_recommender, Algorithm, Dataset, Deadline, EngineConfig, EvaluationHarness,
    ItemItemRecommender, Recommender, Transaction, UserUserRecommender,
};
use std::collections::HashSet;
use std::sync::Arc;

const PRODUCTS: u64 = 12;

fn transactions() -> impl Strategy<Value = Vec<Transaction>> {
    proptest::collection::vec(
        (
            1u64..=8,
            1u64..=PRODUCTS,
            1u32..=26,
            prop_oneof![1 => Just(0.0f64), 5 => 0.01f64..100.0],
        ),
        1..60,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(household, product, week, value)| {
                Transaction::new(household, product, week, value, 1.0)
            })
            .collect()
    })
}

fn dataset(transactions: &[Transaction], config: &EngineConfig) -> Arc<Dataset> {
    build(transactions, &synthetic_products(PRODUCTS), config)
}

fn small_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.user_user.neighbors = 3;
    config.item_item.top_m_items = 3;
    config.item_item.batch_size = 4;
    config.evaluation.list_size = 4;
    config.evaluation.workers = 2;
    config
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn lists_are_short_unseen_unique_and_sorted(rows in transactions()) {
        let config = small_config();
        let dataset = dataset(&rows, &config);
        let n = config.evaluation.list_size;

        for algorithm in Algorithm::ALL {
            let recommender = build_recommender(algorithm, dataset.clone(), &config);
            for household in dataset.train.households() {
                let list = recommender.recommend(household, n, &Deadline::none()).unwrap();
                prop_assert!(list.len() <= n);

                let purchased: HashSet<u64> =
                    dataset.train.purchases(household).into_iter().map(|(p, _)| p).collect();
                let ids: Vec<u64> = list.product_ids().collect();
                let unique: HashSet<u64> = ids.iter().copied().collect();
                prop_assert_eq!(unique.len(), ids.len());
                prop_assert!(ids.iter().all(|id| !purchased.contains(id)));

                prop_assert!(list.items.iter().all(|i| i.score.is_finite()));
                prop_assert!(list.items.windows(2).all(|w| w[0].score >= w[1].score));
                prop_assert_eq!(list.is_empty(), list.shortfall.is_some());
            }
        }
    }

    #[test]
    fn user_similarity_symmetric_and_bounded(rows in transactions()) {
        let config = small_config();
        let dataset = dataset(&rows, &config);
        let recommender = UserUserRecommender::fit(dataset.clone(), config.user_user.clone());

        let households: Vec<u64> = dataset.train.households().collect();
        for &a in &households {
            for &b in &households {
                let s = recommender.similarity(a, b);
                prop_assert!((-1.0..=1.0).contains(&s));
                prop_assert_eq!(s, recommender.similarity(b, a));
            }
        }
    }

    #[test]
    fn item_similarity_symmetric_and_bounded(rows in transactions()) {
        let config = small_config();
        let dataset = dataset(&rows, &config);
        let recommender = ItemItemRecommender::new(dataset.clone(), config.item_item.clone());

        let products: Vec<u64> = dataset.train.product_ids().collect();
        for &a in &products {
            for &b in &products {
                let s = recommender.item_similarity(a, b);
                prop_assert!((0.0..=1.0).contains(&s));
                prop_assert_eq!(s, recommender.item_similarity(b, a));
            }
        }
    }

    #[test]
    fn recommendations_are_deterministic(rows in transactions()) {
        let config = small_config();
        let n = config.evaluation.list_size;
        let first = dataset(&rows, &config);
        let second = dataset(&rows, &config);

        for algorithm in Algorithm::ALL {
            let a = build_recommender(algorithm, first.clone(), &config);
            let b = build_recommender(algorithm, second.clone(), &config);
            for household in first.train.households() {
                prop_assert_eq!(
                    a.recommend(household, n, &Deadline::none()).unwrap(),
                    b.recommend(household, n, &Deadline::none()).unwrap()
                );
            }
        }
    }

    #[test]
    fn item_batch_order_does_not_change_ranking(
        rows in transactions(),
        batch_size in 1usize..6,
        seed in any::<u64>(),
    ) {
        let mut config = small_config();
        config.item_item.batch_size = batch_size;
        let dataset = dataset(&rows, &config);
        let recommender = ItemItemRecommender::new(dataset.clone(), config.item_item.clone());

        // Deterministic shuffle of the batch order from the seed
        let mut shuffled: Vec<_> = recommender.batches().iter().collect();
        let len = shuffled.len();
        for i in (1..len).rev() {
            let j = (seed.rotate_left(i as u32) % (i as u64 + 1)) as usize;
            shuffled.swap(i, j);
        }

        for household in dataset.train.households() {
            let parallel = recommender.recommend(household, 4, &Deadline::none()).unwrap();
            let ordered = recommender
                .rank_from_batches(household, 4, recommender.batches(), &Deadline::none())
                .unwrap();
            let permuted = recommender
                .rank_from_batches(household, 4, shuffled.clone(), &Deadline::none())
                .unwrap();
            prop_assert_eq!(&parallel, &ordered);
            prop_assert_eq!(&ordered, &permuted);
        }
    }

    #[test]
    fn aggregate_metrics_stay_in_unit_interval(rows in transactions()) {
        let config = small_config();
        let dataset = dataset(&rows, &config);
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let harness = EvaluationHarness::new(dataset.clone(), config.evaluation.clone());

        for algorithm in Algorithm::ALL {
            let recommender = build_recommender(algorithm, dataset.clone(), &config);
            let evaluation = runtime.block_on(harness.evaluate(recommender)).unwrap();
            let r = &evaluation.result;

            for metric in [r.hit_rate, r.precision_at_n, r.recall_at_n, r.user_coverage, r.catalog_coverage] {
                prop_assert!((0.0..=1.0).contains(&metric));
            }
            prop_assert_eq!(
                r.evaluated_users + r.cold_start_users + r.sparse_users + r.timed_out_users + r.failed_users,
                r.eligible_users
            );
            prop_assert_eq!(r.failed_users, 0);
        }
    }

    #[test]
    fn household_without_history_is_cold_start_everywhere(rows in transactions()) {
        let config = small_config();
        let dataset = dataset(&rows, &config);

        for algorithm in Algorithm::ALL {
            let recommender = build_recommender(algorithm, dataset.clone(), &config);
            let list = recommender.recommend(10_000, 4, &Deadline::none()).unwrap();
            prop_assert!(list.is_empty());
            prop_assert_eq!(list.shortfall, Some(shelfwise_core::Shortfall::ColdStart));
        }
    }
}
