//! Single-household recommendation command

use super::helpers::{load_config, load_inputs, DataArgs, OutputFormat};
use shelfwise_core::{
    build_recommender,
    error::{Result, ShelfwiseError},
    Algorithm, Deadline, Experiment, HouseholdId, Shortfall,
};
use std::path::PathBuf;

/// Handle the recommend command
pub async fn handle(
    data: DataArgs,
    config_path: Option<PathBuf>,
    household_id: HouseholdId,
    algorithm: String,
    list_size: Option<usize>,
    format: String,
) -> Result<()> {
    let algorithm: Algorithm = algorithm.parse()?;
    let format = OutputFormat::parse(&format)?;
    let config = load_config(config_path.as_deref())?;
    let n = list_size.unwrap_or(config.evaluation.list_size);
    let budget = config.evaluation.per_user_timeout();

    let experiment = Experiment::new(config);
    let (transactions, products) = load_inputs(&data).await?;
    let dataset = experiment.build(&transactions, &products)?;

    let config = experiment.config().clone();
    let list = tokio::task::spawn_blocking(move || {
        let recommender = build_recommender(algorithm, dataset, &config);
        recommender.recommend(household_id, n, &Deadline::after(budget))
    })
    .await
    .map_err(|e| ShelfwiseError::Other(format!("Async execution failed: {}", e)))??;

    match list.shortfall {
        Some(Shortfall::ColdStart) => return Err(ShelfwiseError::ColdStart { household_id }),
        Some(Shortfall::Sparsity) => {
            return Err(ShelfwiseError::Sparsity {
                household_id,
                reason: format!("{} found no candidates", algorithm),
            })
        }
        None => {}
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&list)?),
        OutputFormat::Text => {
            println!("{} recommendations for household {}:", algorithm, household_id);
            for (rank, item) in list.items.iter().enumerate() {
                println!("  {:>2}. product {:<10} score {:.4}", rank + 1, item.product_id, item.score);
            }
        }
    }

    Ok(())
}
