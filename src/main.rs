mod cache;
mod config;
mod devops;
mod error;
mod logging;
mod routes;
mod sprint;
mod tenant;
#[cfg(test)]
mod testing;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::ResponseCache;
use crate::devops::DevOpsClient;
use crate::routes::AppState;
use crate::sprint::SprintAggregator;
use crate::tenant::TenantRegistry;

#[derive(Parser, Debug)]
#[command(name = "sprintdeck")]
#[command(about = "Per-tenant sprint dashboards backed by Azure DevOps")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./sprintdeck.yaml, then $XDG_CONFIG_HOME/sprintdeck/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Address to listen on, overriding server.bind
  #[arg(short, long)]
  bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(bind) = args.bind {
    config.server.bind = bind;
  }

  let _log_guard = logging::init(&config.logging)?;

  let client = DevOpsClient::new(&config.devops)?;
  let tenants = TenantRegistry::new(&config.tenants);
  if tenants.is_empty() {
    warn!("no tenants configured, every tenant route will answer 401");
  }

  let state = AppState {
    aggregator: Arc::new(SprintAggregator::new(client)),
    tenants: Arc::new(tenants),
    cache: Arc::new(ResponseCache::new(
      config.cache.ttl(),
      config.cache.max_entries,
    )),
  };

  let addr = config.server.bind;
  let listener = tokio::net::TcpListener::bind(addr)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", addr, e))?;
  info!(
    %addr,
    organization = %config.devops.organization,
    tenants = state.tenants.len(),
    "sprintdeck listening"
  );

  axum::serve(listener, routes::router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| eyre!("Server error: {}", e))?;

  info!("shut down");
  Ok(())
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_ok() {
    info!("shutdown signal received");
  }
}
