//! Statut Prep - Main Entry Point

use clap::Parser;
use statut_prep::cli::{
    cmd_fit_global, cmd_fit_segmented, cmd_harmonize, cmd_info, cmd_transform, Cli, Commands,
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statut_prep=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::FitGlobal { data, output, neighbors, strict_target } => {
            cmd_fit_global(data.as_deref(), &output, neighbors, strict_target)?;
        }
        Commands::FitSegmented { data, output, neighbors } => {
            cmd_fit_segmented(data.as_deref(), &output, neighbors)?;
        }
        Commands::Harmonize { data, output } => {
            cmd_harmonize(&data, &output)?;
        }
        Commands::Transform { pipeline, data, output, prepared } => {
            cmd_transform(&pipeline, &data, &output, prepared)?;
        }
        Commands::Info { data } => {
            cmd_info(data.as_deref())?;
        }
    }

    Ok(())
}
