//! Full comparison run

use super::helpers::{load_config, load_inputs, write_json, DataArgs};
use shelfwise_core::{error::Result, Algorithm, Experiment};
use std::path::PathBuf;

/// Handle the evaluate command
pub async fn handle(
    data: DataArgs,
    config_path: Option<PathBuf>,
    list_size: Option<usize>,
    algorithms: Vec<String>,
    max_users: Option<usize>,
    output: Option<PathBuf>,
    recommendations_out: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(n) = list_size {
        config.evaluation.list_size = n;
    }
    if max_users.is_some() {
        config.evaluation.max_users = max_users;
    }

    let mut experiment = Experiment::new(config);
    if !algorithms.is_empty() {
        let selected = algorithms
            .iter()
            .map(|name| name.parse::<Algorithm>())
            .collect::<Result<Vec<_>>>()?;
        experiment = experiment.with_algorithms(selected);
    }

    let (transactions, products) = load_inputs(&data).await?;
    let result = experiment.run(&transactions, &products).await?;

    println!("{}", result.summary);
    println!();
    print!("{}", result.report.render_table());

    if let Some(path) = output {
        result.report.write_json(&path)?;
        println!("\nReport written to {}", path.display());
    }
    if let Some(path) = recommendations_out {
        write_json(&path, &result.recommendations)?;
        println!("Recommendations written to {}", path.display());
    }

    Ok(())
}
