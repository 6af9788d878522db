use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use wxrelay_core::Config;
use wxrelay_server::AppState;
use wxrelay_weather::OpenWeatherClient;

#[tokio::main]
async fn main() -> Result<()> {
    wxrelay_core::init()?;

    let (config, _validation) = Config::load_validated()?;

    let store_config = config.store.clone();
    let store = tokio::task::spawn_blocking(move || {
        wxrelay_store::open_with_retry(
            &store_config.database_path,
            store_config.open_retries,
            Duration::from_secs(store_config.retry_interval_secs),
        )
    })
    .await
    .context("Store bootstrap task failed")??;

    let gateway = OpenWeatherClient::new(&config.provider)
        .context("Failed to build weather provider client")?;
    let state = AppState::new(Arc::new(Mutex::new(store)), Arc::new(gateway));

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("wxrelay listening on {}", listener.local_addr()?);

    wxrelay_server::serve(listener, state, shutdown_signal()).await?;

    tracing::info!("wxrelay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
