//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/mailer/credential wiring and shared lookups
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: read/write representations and request validation
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use yamdb_infra::{InMemoryStore, LogMailer, PostgresStore, Store};

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router from configuration (entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresStore::connect(url, config.database_max_connections)
                .await
                .context("failed to connect to Postgres")?;
            store
                .ensure_schema()
                .await
                .context("failed to bootstrap database schema")?;
            tracing::info!(max_connections = config.database_max_connections, "using Postgres store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
            Arc::new(InMemoryStore::new())
        }
    };

    let services = AppServices::new(store, Arc::new(LogMailer), config);
    Ok(build_router(Arc::new(services)))
}

/// Router over already wired services.
pub fn build_router(services: Arc<AppServices>) -> Router {
    let auth_state = services.auth_state();

    let api = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::identify_caller,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/v1", api)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::trace_requests)))
}
