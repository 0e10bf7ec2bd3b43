mod routes;
mod state;
mod tools;

use std::sync::Arc;

use anyhow::{Context, Result};
use icloud_caldav_core::ServerConfig;
use icloud_caldav_provider::ICloudConnector;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env().context("Config error")?;

    tracing::info!(
        caldav_url = %config.caldav_url,
        apple_id = %config.apple_id,
        tzid = %config.default_tzid,
        profile = config.profile.name(),
        "starting icloud-caldav-server"
    );

    let addr = config.bind_addr();
    let state = AppState::new(config, Arc::new(ICloudConnector));
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("listening on http://{}/mcp", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
