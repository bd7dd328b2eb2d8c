use anyhow::{Context, Result};
use ride_api::{build_app, ApiConfig};
use ride_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("ride_api");

    let config = ApiConfig::from_env()?;
    let bind = config.bind.clone();
    let telegram_configured = config.telegram.is_some();

    let app = build_app(config)?;

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(bind = %bind, telegram_configured, "ride desk api started");

    axum::serve(listener, app).await?;
    Ok(())
}
