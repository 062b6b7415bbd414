use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use uuid::Uuid;
use warden::{
    config::WardenConfig,
    db::DbPool,
    models::Sentiment,
    notifications,
    observability,
    retention::{self, LifecycleEngine, LifecycleError},
};

/// Config file used when `--config` is not given, if it exists.
const DEFAULT_CONFIG_FILE: &str = "warden.toml";

#[derive(Parser, Debug)]
#[command(version, about = "Conversation retention lifecycle engine", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (defaults to ./warden.toml if it exists)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run one lifecycle pass and print the result as JSON
    ///
    /// Exits with status 1 if any step failed.
    Run,
    /// Run lifecycle passes on the configured interval until interrupted
    Worker,
    /// Process a subject's erasure request
    Erase {
        /// Subject whose records should be erased
        #[arg(long)]
        subject: Uuid,
        /// Pending erasure request to complete
        #[arg(long)]
        request: Uuid,
    },
    /// Classify a transcript and print the result as JSON (no store access)
    Classify {
        /// Sentiment label from the conversational pipeline
        #[arg(short, long, default_value = "neutral")]
        sentiment: Sentiment,
        /// Transcript text
        transcript: String,
    },
    /// Run database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = load_config(args.config.as_deref());

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    match args.command {
        Command::Run => run_once(config).await,
        Command::Worker => run_worker(config).await,
        Command::Erase { subject, request } => run_erase(config, subject, request).await,
        Command::Classify {
            sentiment,
            transcript,
        } => {
            let classification = retention::classify(&transcript, sentiment);
            print_json(&classification);
        }
        Command::Migrate => run_migrate(config).await,
    }
}

/// Load the explicit config file, else `./warden.toml`, else defaults.
fn load_config(explicit_config_path: Option<&str>) -> WardenConfig {
    let path = match explicit_config_path {
        Some(path) => PathBuf::from(path),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return WardenConfig::default();
            }
            default
        }
    };

    match WardenConfig::from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: failed to serialize output: {}", e);
            std::process::exit(1);
        }
    }
}

/// Open the store (migrating if configured) and build the engine.
async fn open_engine(config: &WardenConfig) -> Arc<LifecycleEngine> {
    if config.database.is_none() {
        eprintln!(
            "Error: Database is not configured.\n\
             Add a [database] section to your config file."
        );
        std::process::exit(1);
    }

    let db = match DbPool::from_config(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if config.database.run_migrations()
        && let Err(e) = db.run_migrations().await
    {
        tracing::error!(error = %e, "Database migrations failed");
        eprintln!("Error: Database migrations failed: {}", e);
        std::process::exit(1);
    }

    let channel = match notifications::from_config(&config.notifications) {
        Ok(channel) => channel,
        Err(e) => {
            eprintln!("Error: Failed to build notification channel: {}", e);
            std::process::exit(1);
        }
    };

    match LifecycleEngine::new(Arc::new(db), channel, config.retention.clone()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_once(config: WardenConfig) {
    let engine = open_engine(&config).await;
    let result = engine.run_lifecycle().await;
    print_json(&result);
    if result.has_errors() {
        std::process::exit(1);
    }
}

async fn run_worker(config: WardenConfig) {
    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let engine = open_engine(&config).await;

    tokio::select! {
        _ = retention::start_lifecycle_worker(engine) => {},
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, stopping lifecycle worker");
        },
    }
}

async fn run_erase(config: WardenConfig, subject: Uuid, request: Uuid) {
    let engine = open_engine(&config).await;
    match engine.process_erasure_request(subject, request).await {
        Ok(outcome) => print_json(&outcome),
        Err(LifecycleError::Validation(msg)) => {
            eprintln!("Error: invalid erasure request: {}", msg);
            std::process::exit(2);
        }
        Err(e) => {
            tracing::error!(error = %e, "Erasure request failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_migrate(config: WardenConfig) {
    tracing::info!("Running database migrations");

    if config.database.is_none() {
        eprintln!("Error: Database is not configured. Nothing to migrate.");
        std::process::exit(1);
    }

    match DbPool::from_config(&config.database).await {
        Ok(pool) => match pool.run_migrations().await {
            Ok(()) => {
                tracing::info!("Database migrations completed successfully");
            }
            Err(e) => {
                tracing::error!(error = %e, "Database migrations failed");
                eprintln!("Error: Database migrations failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
