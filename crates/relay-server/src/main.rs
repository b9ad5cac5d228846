//! Bucket Relay
//!
//! Announces newly created storage objects whose path matches the ingest
//! convention on a Pub/Sub topic.

use clap::{Parser, Subcommand};
use relay_api::RelayServer;
use relay_core::RelayConfig;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bucket-relay")]
#[command(author = "Bucket Relay Team")]
#[command(version = relay_core::VERSION)]
#[command(about = "Storage event to message bus relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "RELAY_CONFIG")]
    config: Option<String>,

    /// Bind address
    #[arg(long, env = "RELAY_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port number (Cloud Run sets PORT)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RELAY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, env = "RELAY_LOG_FORMAT")]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay service
    Serve,

    /// Validate the configuration and print the resolved routing
    Check,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = if let Some(config_path) = &cli.config {
        RelayConfig::from_file(config_path)?
    } else {
        RelayConfig::from_env()
    };

    apply_overrides(&cli, &mut config);

    init_logging(&config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Version => {
            println!("bucket-relay {}", relay_core::VERSION);
        }
        Commands::Check => {
            config.validate()?;
            println!("pattern:   {}", config.routing.csv_pattern);
            println!("topic:     {}", config.routing.topic_path());
            println!(
                "secret:    {}",
                config
                    .credentials
                    .secret_version_name(&config.routing.project_id)
            );
            println!("publisher: {}", config.credentials.impersonate_service_account);
        }
        Commands::Serve => run_server(config).await?,
    }

    Ok(())
}

/// Override with CLI args
fn apply_overrides(cli: &Cli, config: &mut RelayConfig) {
    if let Some(bind) = &cli.bind {
        config.server.bind_address = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
}

fn init_logging(config: &RelayConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

async fn run_server(config: RelayConfig) -> anyhow::Result<()> {
    info!("Starting bucket relay {}", relay_core::VERSION);
    info!("Project: {}", config.routing.project_id);

    let server = RelayServer::new(config);
    server.run().await?;

    Ok(())
}
