use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use api_ingress::{ApiIngress, ApiIngressConfig};
use runtime::{AppConfig, CliArgs};
use users::UsersModule;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Users Server - HTTP CRUD service for user records backed by SQLite
#[derive(Parser)]
#[command(name = "users-server")]
#[command(about = "Users Server - HTTP CRUD service for user records backed by SQLite")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory database instead of the configured one
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI args passed down to config/app
    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(args.config.as_deref())?;

    // Apply CLI overrides (port / verbosity / mock)
    config.apply_cli_overrides(&args);

    // Print config and exit if requested
    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, &config.home_dir());
    tracing::info!("Users Server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config, args),
    }
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    // Base dir for resolving relative sqlite paths (already absolute & created)
    let base_dir = config.home_dir();
    let conn = runtime::db::connect(&config.database, &base_dir, args.mock).await?;

    let users = UsersModule::init(conn).await?;

    let ingress = ApiIngress::new(ApiIngressConfig::from(&config.server));
    let router = ingress.build_router(users.register_rest(axum::Router::new()));

    let shutdown = async {
        if let Err(e) = runtime::shutdown::wait_for_shutdown().await {
            tracing::error!(error = %e, "failed to listen for shutdown signals");
        }
    };

    ingress.serve(router, shutdown).await?;
    tracing::info!("Users Server stopped");
    Ok(())
}

fn check_config(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");

    // --mock replaces the database, so the configured URL is irrelevant
    if !args.mock {
        let backend = runtime::db::detect_from_dsn(&config.database)?;
        tracing::info!("Database backend: {}", backend);
    }

    let addr = ApiIngressConfig::from(&config.server).bind_addr;
    addr.parse::<std::net::SocketAddr>()
        .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", addr, e))?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);

    Ok(())
}
