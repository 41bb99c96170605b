use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use storefront_api::app::{build_app, services};
use storefront_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storefront_observability::init();

    let config = ApiConfig::from_env();
    tracing::info!(
        facet_mode = %config.catalog.facet_mode,
        page_size = config.catalog.page_size,
        store_timeout_ms = config.catalog.store_timeout.as_millis() as u64,
        "starting storefront api"
    );

    let services = services::build_services(&config)
        .await
        .context("failed to initialise the catalog store")?;
    let app = build_app(Arc::new(services));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
