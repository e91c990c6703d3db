//! Shared fixtures for integration tests
#![allow(dead_code)]

use shelfwise_core::{
    Dataset, EngineConfig, MatrixBuilder, ProductAttributes, ProductId, Transaction,
};
use std::path::Path;
use std::sync::Arc;

/// Five products over two departments.
///
/// P1 and P3 share department, commodity and brand; P4 and P5 share only
/// department and brand.
pub fn scenario_products() -> Vec<ProductAttributes> {
    vec![
        ProductAttributes::new(1, "GROCERY", "SOUP", "CANNED SOUP", "CAMPBELL", "National"),
        ProductAttributes::new(2, "GROCERY", "BAKERY", "BREAD", "PEPPERIDGE", "National"),
        ProductAttributes::new(3, "GROCERY", "SOUP", "DRY SOUP", "LIPTON", "National"),
        ProductAttributes::new(4, "PRODUCE", "ONIONS", "SWEET ONIONS", "FARM A", "Private"),
        ProductAttributes::new(5, "PRODUCE", "POTATOES", "RUSSET", "FARM B", "Private"),
    ]
}

/// Four households with train history; household 1 buys P3 in the test
/// window and household 5 appears only in test.
pub fn scenario_transactions() -> Vec<Transaction> {
    vec![
        // train, weeks 1-21
        Transaction::new(1, 1, 3, 10.0, 1.0),
        Transaction::new(1, 2, 5, 5.0, 1.0),
        Transaction::new(2, 1, 2, 8.0, 1.0),
        Transaction::new(2, 2, 8, 2.0, 1.0),
        Transaction::new(2, 3, 9, 6.0, 1.0),
        Transaction::new(3, 2, 4, 9.0, 1.0),
        Transaction::new(3, 4, 11, 3.0, 1.0),
        Transaction::new(4, 4, 6, 4.0, 1.0),
        Transaction::new(4, 5, 7, 6.0, 1.0),
        // test, weeks 22-26
        Transaction::new(1, 3, 23, 2.5, 1.0),
        Transaction::new(5, 4, 24, 1.0, 1.0),
    ]
}

/// N = 2, one neighbour, two workers
pub fn scenario_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.user_user.neighbors = 1;
    config.evaluation.list_size = 2;
    config.evaluation.workers = 2;
    config
}

pub fn build(
    transactions: &[Transaction],
    products: &[ProductAttributes],
    config: &EngineConfig,
) -> Arc<Dataset> {
    Arc::new(
        MatrixBuilder::new(config)
            .build(transactions, products)
            .expect("fixture builds"),
    )
}

pub fn scenario_dataset() -> Arc<Dataset> {
    build(&scenario_transactions(), &scenario_products(), &scenario_config())
}

/// Attributes derived from the id so any id range forms a valid table
pub fn synthetic_product(product_id: ProductId) -> ProductAttributes {
    let departments = ["GROCERY", "PRODUCE", "DRUG GM", "MEAT"];
    let brands = ["National", "Private"];
    ProductAttributes::new(
        product_id,
        departments[(product_id % 4) as usize],
        format!("COMMODITY {}", product_id % 5),
        format!("SUB {}", product_id % 7),
        format!("MFR {}", product_id % 3),
        brands[(product_id % 2) as usize],
    )
}

pub fn synthetic_products(n: u64) -> Vec<ProductAttributes> {
    (1..=n).map(synthetic_product).collect()
}

/// Write records as CSV with the export's header names
pub fn write_csv<T: serde::Serialize>(path: &Path, records: &[T]) {
    let mut writer = csv::Writer::from_path(path).expect("create csv");
    for record in records {
        writer.serialize(record).expect("write record");
    }
    writer.flush().expect("flush csv");
}
