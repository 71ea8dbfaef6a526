//! Visitor counter entry point.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use visitor_counter::api::{create_router, AppState};
use visitor_counter::config::{Config, LogFormat, StoreBackend};
use visitor_counter::counter::CounterService;
use visitor_counter::metrics;
use visitor_counter::store::open_store;
use visitor_counter::utils::shutdown_signal;

/// Atomic visitor counter behind a CORS-enabled HTTP endpoint.
#[derive(Parser, Debug)]
#[command(name = "visitor-counter")]
#[command(about = "Counts site visits with one atomic increment per POST")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the store backend.
    #[arg(long, global = true, value_enum)]
    backend: Option<StoreBackend>,

    /// Override the SQLite database path.
    #[arg(long, global = true)]
    database_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the counter endpoint (default).
    Serve {
        /// HTTP server port.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Increment the counter once and print the new value.
    Increment,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    let mut config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Override with CLI args if provided
    if let Some(backend) = args.backend {
        config.store_backend = backend;
    }
    if let Some(path) = args.database_path.clone() {
        config.database_path = path;
    }

    init_tracing(&config, args.verbose);

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(&config),
        Some(Command::Increment) => cmd_increment(&config).await,
        Some(Command::Serve { port }) => {
            if let Some(port) = port.or(args.port) {
                config.port = port;
            }
            cmd_serve(config).await
        }
        None => {
            if let Some(port) = args.port {
                config.port = port;
            }
            cmd_serve(config).await
        }
    }
}

fn init_tracing(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("visitor_counter=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).init(),
    }
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("VISITOR COUNTER - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Counter: {}", config.counter_name);
    println!("  Endpoint: {}", config.endpoint_path);
    println!("  Backend: {}", config.store_backend);
    if config.store_backend == StoreBackend::Sqlite {
        println!("  Database: {}", config.database_path.display());
    }
    println!("  Store Timeout: {}ms", config.store_timeout_ms);
    println!("  Port: {}", config.port);
    println!("  Log Format: {}", config.log_format);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Perform a single increment against the configured store.
async fn cmd_increment(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    let store = open_store(config)?;
    let counter = CounterService::from_config(store, config);
    let count = counter.increment_and_get().await?;

    println!("{} = {}", counter.key(), count);
    Ok(())
}

/// Serve the counter endpoint until a shutdown signal arrives.
async fn cmd_serve(config: Config) -> anyhow::Result<()> {
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    let prometheus = metrics::install_prometheus()?;

    // One store handle for the life of the process
    let store = open_store(&config).map_err(|e| {
        error!("Failed to open {} store: {}", config.store_backend, e);
        e
    })?;
    info!(
        backend = store.backend(),
        counter = %config.counter_name,
        "Counter store opened"
    );

    let counter = CounterService::from_config(store, &config);
    let app_state = AppState::new(counter).with_prometheus(prometheus);
    let router = create_router(app_state.clone(), &config.endpoint_path);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    info!("Counter endpoint: POST/OPTIONS {}", config.endpoint_path);

    app_state.set_ready(true);

    let shutdown_state = app_state.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_state.set_ready(false);
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
