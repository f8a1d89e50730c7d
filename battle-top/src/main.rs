//! battle-top: HTTP server for the Battle Top ranked-list community

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use battle_top::{create_router, events::spawn_logging_listener, AppState, Config, Database};

#[derive(Parser)]
#[command(name = "battle-top")]
#[command(about = "Ranked-list community server with a battle coin economy")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "battle-top.toml")]
    config: PathBuf,

    /// Listen address (overrides config file)
    #[arg(short, long, env = "BATTLE_TOP_LISTEN")]
    listen: Option<String>,

    /// SQLite database path (overrides config file)
    #[arg(short, long, env = "BATTLE_TOP_DB")]
    database: Option<PathBuf>,

    /// Session signing secret (overrides config file)
    #[arg(long, env = "BATTLE_TOP_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Development mode: built-in signing secret and permissive CORS
    #[arg(long, env = "BATTLE_TOP_DEV")]
    dev: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "battle_top=info,tower_http=info".into());
    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = Config::load_or_default(&cli.config)?;
    if !cli.config.exists() {
        info!("Config file {} not found, using defaults", cli.config.display());
    }

    // Apply CLI overrides
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }
    if let Some(path) = cli.database {
        config.database.path = path;
    }
    if let Some(secret) = cli.jwt_secret {
        config.auth.jwt_secret = secret;
    }
    if cli.dev {
        config.auth.dev_mode = true;
        config.server.permissive_cors = true;
    }

    let addr = config.listen_addr()?;

    info!("======================================");
    info!("  Battle Top");
    info!("======================================");
    info!("Listen: {}", addr);
    info!("Database: {}", config.database.path.display());
    info!("Mode: {}", if config.auth.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!(
        "Features: {}",
        config
            .features
            .enabled()
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!("======================================");

    if config.auth.dev_mode && config.auth.jwt_secret.is_empty() {
        warn!("Using the built-in development signing secret");
    }
    if config.auth.init_key.is_none() {
        info!("No init key configured; /api/init is disabled");
    }

    let db = Database::open(&config.database.path)?;
    let state = AppState::new(config, db)?;
    spawn_logging_listener(state.events.clone());

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Battle Top listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
