use anyhow::{Context, Result};
use clap::Parser;
use maestro_cli::cli::Cli;
use maestro_cli::config::{self, Overrides};
use maestro_cli::commands;
use maestro_sdk::StrategicMindBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;
    let config = Overrides {
        models_path: cli.models_path,
        repository: cli.repository,
    }
    .apply(config);
    tracing::debug!("Loaded configuration: {:?}", config);

    let engine = StrategicMindBuilder::new()
        .with_config(config)
        .build()
        .await
        .context("failed to initialize Strategic Mind")?;

    let output = commands::execute(&engine, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "maestro=info,maestro_cli=info,maestro_sdk=info,maestro_ml=info,maestro_repository=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}
