// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Werkout.in: fitness marketplace backend
//!
//! This crate provides the backend API connecting seekers with fitness
//! providers: Clerk-backed identity, server-side onboarding, seeker and
//! provider profiles, geospatial provider search, connections and Strava
//! account linking.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::MongoDb;
use services::{
    ClerkClient, Geocoder, IdentityBridge, SessionVerifier, StravaClient, StravaService,
    TokenCipher,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: MongoDb,
    pub session_verifier: Arc<SessionVerifier>,
    pub identity: IdentityBridge,
    pub geocoder: Geocoder,
    pub strava: StravaService,
}

impl AppState {
    /// Wire services together around the given clients.
    pub fn new(
        config: Config,
        db: MongoDb,
        session_verifier: Arc<SessionVerifier>,
        clerk: ClerkClient,
        geocoder: Geocoder,
    ) -> anyhow::Result<Self> {
        let cipher = Arc::new(TokenCipher::new(&config.token_encryption_key)?);
        let strava_client = StravaClient::new(
            config.strava_client_id.clone(),
            config.strava_client_secret.clone(),
        )?;

        Ok(Self {
            identity: IdentityBridge::new(db.clone(), clerk),
            strava: StravaService::new(strava_client, db.clone(), cipher),
            config,
            db,
            session_verifier,
            geocoder,
        })
    }
}
