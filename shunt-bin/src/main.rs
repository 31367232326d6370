use clap::Parser;
use std::path::PathBuf;

/// Transparent failover gateway for prioritized upstream API providers.
#[derive(Parser)]
#[command(name = "shunt", version, about)]
struct Cli {
    /// Path to the config file (default: SHUNT_CONFIG or ./shunt.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address from the config.
    #[arg(long)]
    listen: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Shortcut for --log-level debug.
    #[arg(short, long)]
    verbose: bool,

    /// Shortcut for --log-level error.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> shunt_core::Result<()> {
    // Load config first so the log format can come from it
    let loader = shunt_config::ConfigLoader::load(cli.config.as_deref())?;
    let mut config = loader.get();
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }

    // Resolve log level: --verbose > --quiet > --log-level > config default
    let log_level = if cli.verbose {
        "debug".to_string()
    } else if cli.quiet {
        "error".to_string()
    } else {
        cli.log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone())
    };

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
            )
            .json()
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
            )
            .with_target(false)
            .init();
    }

    shunt_server::start_server(config).await
}
