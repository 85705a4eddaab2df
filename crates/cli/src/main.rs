mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use convertino_core::{load_config_or_default, metrics, validate_config};

use cli::{Cli, Command};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    if let Some(out) = cli.out {
        config.output.dir = out;
    }
    validate_config(&config).context("Configuration validation failed")?;
    info!("Conversion service: {}", config.service.base_url);

    match cli.command {
        Command::Routes => commands::list_routes(&config)?,
        Command::Tools => commands::list_tools(),
        Command::Convert {
            from,
            to,
            zip,
            files,
        } => commands::convert(&config, &from, to.as_deref(), zip, &files).await?,
        Command::Tool {
            id,
            to,
            options,
            zip,
            files,
        } => commands::run_tool(&config, &id, options.into(), to.as_deref(), zip, &files).await?,
        Command::Merge { files, name } => commands::merge(&config, &files, &name).await?,
    }

    if cli.metrics {
        print!("{}", metrics::render_metrics().context("Failed to encode metrics")?);
    }
    Ok(())
}
