use anyhow::Result;
use clap::Parser;
use redirector::config::Config;
use redirector::config_validator::ConfigValidator;
use redirector::server::Server;
use redirector::store::{LinkStore, MemoryStore, SupabaseStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "redirector", version, about = "Short-link redirect service")]
struct Cli {
    /// Override BIND_ADDR
    #[arg(long)]
    bind_addr: Option<SocketAddr>,

    /// Override LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,

    /// Serve links from a JSON file instead of the hosted backend
    #[arg(long, value_name = "FILE")]
    memory: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration from environment
    let mut config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    if let Some(bind_addr) = cli.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("redirector={},tower_http=debug", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    ConfigValidator::validate(&config, cli.memory.is_none())
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    tracing::info!("Starting redirector service");
    tracing::info!(
        "Configuration: bind_addr={}, backend={}, geo_enabled={}, geo_cache={}",
        config.bind_addr,
        if cli.memory.is_some() { "memory" } else { config.supabase_url.as_str() },
        config.geo_enabled,
        if config.redis_enabled() { "redis" } else { "memory" }
    );

    let store: Arc<dyn LinkStore> = match &cli.memory {
        Some(path) => {
            let store = MemoryStore::from_json_file(path)
                .map_err(|e| anyhow::anyhow!("Failed to load links: {}", e))?;
            tracing::info!("Serving links from {}", path.display());
            Arc::new(store)
        }
        None => Arc::new(
            SupabaseStore::new(
                &config.supabase_url,
                &config.supabase_service_role_key,
                config.backend_timeout(),
            )
            .map_err(|e| anyhow::anyhow!("Failed to create backend client: {}", e))?,
        ),
    };

    // Create and run the server
    let server = Server::new(&config, store)
        .map_err(|e| anyhow::anyhow!("Failed to create server: {}", e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
