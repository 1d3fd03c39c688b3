use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

use rental_availability::adapters::clock::SystemClock;
use rental_availability::adapters::cms::CmsStore;
use rental_availability::adapters::memory::MemoryStore;
use rental_availability::config::load_config;
use rental_availability::config::types::StoreBackend;
use rental_availability::mcp::server::RentalMcpServer;
use rental_availability::services::availability::AvailabilityService;

fn find_config_path() -> PathBuf {
    // Explicit override first, then common locations
    if let Ok(path) = std::env::var("RENTAL_CONFIG") {
        return PathBuf::from(path);
    }
    let candidates = [
        PathBuf::from("config.yaml"),
        binary_dir().join("config.yaml"),
    ];

    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    candidates[0].clone()
}

fn binary_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to stderr (stdout is reserved for MCP JSON-RPC)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting rental-availability server");

    let config_path = find_config_path();
    let config = load_config(&config_path)?;
    let clock = Arc::new(SystemClock);

    let service = match config.store.backend {
        StoreBackend::Memory => {
            tracing::info!(path = %config.store.data_path, "using in-memory inventory");
            let store = MemoryStore::load(Path::new(&config.store.data_path))
                .with_context(|| format!("loading inventory {}", config.store.data_path))?;
            AvailabilityService::from_store(Arc::new(store), clock, config.booking)
        }
        StoreBackend::Cms => {
            tracing::info!(base_url = %config.store.base_url, "using CMS store");
            let store = CmsStore::new(&config.store).context("building CMS HTTP client")?;
            AvailabilityService::from_store(Arc::new(store), clock, config.booking)
        }
    };

    let server = RentalMcpServer::new(Arc::new(service));

    // Start MCP server over stdio
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
