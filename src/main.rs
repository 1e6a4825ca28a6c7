// SPDX-License-Identifier: MIT

//! Recipe-Share API Server
//!
//! Mediates between browsers and the hosted identity/storage provider:
//! session authentication at the gateway, ownership-scoped writes behind it.

use recipe_share::{
    config::Config,
    provider::{AuthClient, RecordClient},
    store::ContentStore,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Missing provider configuration is startup-fatal, never a runtime error.
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Recipe-Share API");

    // Provider clients are constructed once here and injected; nothing else
    // in the crate builds its own.
    let auth = AuthClient::new(&config.provider_url, &config.provider_anon_key);
    let records = RecordClient::new(&config.provider_url, &config.provider_anon_key);
    let store = ContentStore::new(records);
    tracing::info!(provider = %config.provider_url, "Provider clients initialized");

    let state = Arc::new(AppState {
        config: config.clone(),
        auth,
        store,
    });

    let app = recipe_share::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("recipe_share=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
