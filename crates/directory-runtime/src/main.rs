//! DirKey node binary: configure, start the loops, run until interrupted.

use anyhow::{Context, Result};
use directory_runtime::config::RuntimeConfig;
use directory_runtime::DirectoryRuntime;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RuntimeConfig::from_env().context("loading runtime configuration")?;
    let runtime = DirectoryRuntime::start(config);

    info!("directory runtime ready, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    runtime.shutdown().await;
    Ok(())
}
