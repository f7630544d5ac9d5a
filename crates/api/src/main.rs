use anyhow::Context;

use yamdb_api::config::ApiConfig;
use yamdb_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables win either way.
    let _ = dotenvy::dotenv();

    // Logging first, so configuration warnings are visible.
    let log_format: LogFormat = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    yamdb_observability::init(log_format);

    let config = ApiConfig::from_env().context("invalid configuration")?;

    let app = yamdb_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
