//! Configuration management command

use clap::Subcommand;
use shelfwise_core::{
    error::{Result, ShelfwiseError},
    EngineConfig,
};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (defaults, file, environment)
    Show,

    /// Write the default configuration to a TOML file
    Init {
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Handle configuration management command
pub fn handle(action: ConfigAction, config_path: Option<PathBuf>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = EngineConfig::load(config_path.as_deref())?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::Init { path, force } => {
            if path.exists() && !force {
                return Err(ShelfwiseError::InvalidOperation(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            EngineConfig::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}
