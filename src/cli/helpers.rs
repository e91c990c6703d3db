//! Shared CLI helpers

use clap::Args;
use shelfwise_core::{
    error::{Result, ShelfwiseError},
    ingest, EngineConfig, ProductAttributes, Transaction,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Input files every data command needs
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Transaction CSV (household_key, PRODUCT_ID, WEEK_NO, SALES_VALUE, QUANTITY)
    #[arg(short, long, env = "SHELFWISE_TRANSACTIONS")]
    pub transactions: PathBuf,

    /// Product attribute CSV (PRODUCT_ID, DEPARTMENT, COMMODITY_DESC, ...)
    #[arg(short, long, env = "SHELFWISE_PRODUCTS")]
    pub products: PathBuf,
}

/// Output format of the single-result commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(format: &str) -> Result<Self> {
        match format {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(anyhow::anyhow!(
                "Invalid output format '{}': expected text or json",
                other
            )
            .into()),
        }
    }
}

/// Load the layered configuration
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = EngineConfig::load(path)?;
    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

/// Read both CSV inputs off the async executor
pub async fn load_inputs(data: &DataArgs) -> Result<(Vec<Transaction>, Vec<ProductAttributes>)> {
    let data = data.clone();
    let (transactions, products) = tokio::task::spawn_blocking(move || {
        let transactions = ingest::load_transactions(&data.transactions)?;
        let products = ingest::load_products(&data.products)?;
        Ok::<_, ShelfwiseError>((transactions, products))
    })
    .await
    .map_err(|e| ShelfwiseError::Other(format!("Async execution failed: {}", e)))??;

    info!(
        "Loaded {} transactions and {} products",
        transactions.len(),
        products.len()
    );
    Ok((transactions, products))
}

/// Write pretty JSON to `path`
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    info!("Wrote {}", path.display());
    Ok(())
}
