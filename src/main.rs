use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notebook_relay::config::{load_config, RelayConfig};
use notebook_relay::server;

#[derive(Parser)]
#[command(
    name = "notebook-relay",
    version,
    about = "Streams clean incremental answers out of a browser-driven notebook assistant UI"
)]
struct Cli {
    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Shorthand for --log-level debug.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP facade.
    Serve(ServeArgs),
    /// Print the effective configuration and exit.
    Config,
}

#[derive(Args)]
struct ServeArgs {
    /// Listen address, overriding the configuration.
    #[arg(long)]
    listen: Option<String>,

    /// Remote DevTools endpoint, overriding the configuration.
    #[arg(long)]
    cdp_url: Option<String>,

    /// Run the browser headless.
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.debug)?;

    info!("starting notebook-relay v{}", env!("CARGO_PKG_VERSION"));
    let config = load_config(cli.config.as_ref()).await?;

    let result = match cli.command {
        Commands::Serve(args) => cmd_serve(args, config).await,
        Commands::Config => cmd_config(&config),
    };

    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            error!("command failed: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

async fn cmd_serve(args: ServeArgs, mut config: RelayConfig) -> Result<()> {
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(cdp_url) = args.cdp_url {
        config.cdp_url = Some(cdp_url);
    }
    if args.headless {
        config.headless = true;
    }
    server::serve(config).await
}

fn cmd_config(config: &RelayConfig) -> Result<()> {
    let rendered = serde_yaml::to_string(config).context("failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}
