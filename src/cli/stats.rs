//! Matrix statistics command

use super::helpers::{load_config, load_inputs, DataArgs, OutputFormat};
use shelfwise_core::{error::Result, Experiment};
use std::path::PathBuf;

/// Handle the stats command
pub async fn handle(data: DataArgs, config_path: Option<PathBuf>, format: String) -> Result<()> {
    let format = OutputFormat::parse(&format)?;
    let experiment = Experiment::new(load_config(config_path.as_deref())?);
    let (transactions, products) = load_inputs(&data).await?;
    let dataset = experiment.build(&transactions, &products)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&dataset.summary)?),
        OutputFormat::Text => println!("{}", dataset.summary),
    }
    Ok(())
}
