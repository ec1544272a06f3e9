//! Proxy Fetcher CLI application
//!
//! Command-line interface for fetching media proxies from the archive service.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use proxy_fetcher::cli::{handle_fetch, handle_id, handle_inspect, Cli, Commands};
use proxy_fetcher::config::AppConfig;
use proxy_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config);

    info!("Proxy Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Fetch(args) => {
            info!("Executing fetch command");
            handle_fetch(args, config, cli.global.quiet).await
        }
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            handle_inspect(args, config).await
        }
        Commands::Id(args) => handle_id(args, config),
    }
}

/// Initialize logging from CLI verbosity flags, falling back to the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| config.logging.level.clone());

    let filter = EnvFilter::from_default_env();
    let filter = match format!("proxy_fetcher={}", level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => {
            eprintln!("Ignoring invalid log level '{}'", level);
            filter
        }
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
