// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Clerk Backend API client.
//!
//! Used to read a user's identity claims when provisioning the local user,
//! and to mirror `userType` / `profileComplete` into public metadata so the
//! frontend can read them from the session without an API round trip.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Clerk API client.
#[derive(Clone)]
pub struct ClerkClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
    mock_users: Option<Arc<RwLock<HashMap<String, ClerkUser>>>>,
}

impl ClerkClient {
    pub fn new(base_url: &str, secret_key: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key,
            mock_users: None,
        })
    }

    /// In-memory client for tests; no network calls are made.
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: String::new(),
            secret_key: String::new(),
            mock_users: Some(Arc::new(RwLock::new(HashMap::new()))),
        }
    }

    /// Register a user with the mock client. No-op for a real client.
    pub fn insert_mock_user(&self, user: ClerkUser) {
        if let Some(users) = &self.mock_users {
            if let Ok(mut users) = users.write() {
                users.insert(user.id.clone(), user);
            }
        }
    }

    /// Fetch a user by Clerk ID.
    ///
    /// A user Clerk does not know is treated as unauthenticated.
    pub async fn get_user(&self, user_id: &str) -> Result<ClerkUser, AppError> {
        if let Some(users) = &self.mock_users {
            return users
                .read()
                .map_err(|_| AppError::IdentityProvider("mock user store poisoned".into()))?
                .get(user_id)
                .cloned()
                .ok_or(AppError::Unauthorized);
        }

        let url = format!("{}/users/{}", self.base_url, urlencoding::encode(user_id));
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Clerk request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(subject = user_id, "Session subject unknown to Clerk");
            return Err(AppError::Unauthorized);
        }

        check_response_json(response).await
    }

    /// Merge `patch` into the user's public metadata.
    pub async fn update_public_metadata(
        &self,
        user_id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), AppError> {
        if let Some(users) = &self.mock_users {
            let mut users = users
                .write()
                .map_err(|_| AppError::IdentityProvider("mock user store poisoned".into()))?;
            let user = users
                .get_mut(user_id)
                .ok_or_else(|| AppError::IdentityProvider(format!("no such user {}", user_id)))?;
            user.public_metadata.extend(patch);
            return Ok(());
        }

        let url = format!(
            "{}/users/{}/metadata",
            self.base_url,
            urlencoding::encode(user_id)
        );
        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.secret_key)
            .json(&serde_json::json!({ "public_metadata": patch }))
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Clerk request failed: {}", e)))?;

        let _: ClerkUser = check_response_json(response).await?;
        Ok(())
    }
}

async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::IdentityProvider(format!(
            "HTTP {}: {}",
            status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::IdentityProvider(format!("JSON parse error: {}", e)))
}

/// Subset of the Clerk user object the backend needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClerkUser {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    pub primary_email_address_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub public_metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClerkEmailAddress {
    pub id: String,
    pub email_address: String,
}

impl ClerkUser {
    /// The primary email address, falling back to the first listed one.
    pub fn primary_email(&self) -> Option<&str> {
        let primary = self.primary_email_address_id.as_deref().and_then(|id| {
            self.email_addresses
                .iter()
                .find(|e| e.id == id)
                .map(|e| e.email_address.as_str())
        });

        primary
            .or_else(|| self.email_addresses.first().map(|e| e.email_address.as_str()))
            .filter(|e| !e.trim().is_empty())
    }
}
