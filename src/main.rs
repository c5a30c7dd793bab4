// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Werkout.in API Server
//!
//! Connects fitness seekers with trainers, coaches, gyms and clubs nearby.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use werkout_api::{
    config::Config,
    db::MongoDb,
    services::{ClerkClient, Geocoder, SessionVerifier},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Werkout API");

    // One client (and connection pool) for the whole process
    let db = MongoDb::new(&config.mongodb_uri, &config.mongodb_database).await?;
    db.ensure_indexes().await?;
    tracing::info!(database = %config.mongodb_database, "MongoDB ready");

    let session_verifier = Arc::new(SessionVerifier::new(&config)?);
    let clerk = ClerkClient::new(&config.clerk_api_url, config.clerk_secret_key.clone())?;
    let geocoder = Geocoder::new(&config.geocoder_url)?;

    let port = config.port;
    let state = Arc::new(AppState::new(
        config,
        db,
        session_verifier,
        clerk,
        geocoder,
    )?);

    let app = werkout_api::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("werkout_api=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
