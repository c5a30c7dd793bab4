// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Linked third-party fitness accounts.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const PLATFORM_STRAVA: &str = "strava";

/// A linked third-party account, unique per (user, platform).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalProfile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId,
    /// Platform key (e.g. "strava")
    pub platform: String,
    /// Account ID on the platform
    pub platform_user_id: String,
    /// Encrypted access token (base64)
    pub access_token_encrypted: String,
    /// Encrypted refresh token (base64)
    pub refresh_token_encrypted: String,
    /// When the access token expires (RFC 3339)
    pub expires_at: String,
    /// Granted OAuth scopes
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub profile_data: ExternalProfileData,
    pub connected_at: String,
    pub updated_at: String,
}

/// Display fields copied from the platform at link time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalProfileData {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}
