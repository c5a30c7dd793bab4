// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bridge between Clerk identities and local user documents.

use chrono::{Duration, Utc};
use serde_json::{Map, Value};

use crate::db::MongoDb;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::user::{ActivityTracking, Preferences};
use crate::models::{Address, User, UserType};
use crate::services::clerk::ClerkClient;
use crate::time_utils::{format_utc_rfc3339, now_rfc3339};

/// `lastActiveAt` is rewritten at most this often.
const ACTIVE_WRITE_INTERVAL_MINUTES: i64 = 5;

#[derive(Clone)]
pub struct IdentityBridge {
    db: MongoDb,
    clerk: ClerkClient,
}

impl IdentityBridge {
    pub fn new(db: MongoDb, clerk: ClerkClient) -> Self {
        Self { db, clerk }
    }

    /// Local user for the session, if one exists. Records activity.
    pub async fn find(&self, auth: &AuthUser) -> Result<Option<User>, AppError> {
        let user = self.db.get_user_by_clerk_id(&auth.subject).await?;
        if let Some(user) = &user {
            self.record_activity(user, auth.session_id.as_deref()).await;
        }
        Ok(user)
    }

    /// Local user for the session; 404 if onboarding has not created one.
    pub async fn require(&self, auth: &AuthUser) -> Result<User, AppError> {
        self.find(auth)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found; select a user type first".into()))
    }

    /// Local user for the session, created from Clerk's record if absent.
    ///
    /// Returns the user and whether it was created by this call. Two
    /// concurrent first requests race on the unique `clerkId` index; the loser
    /// reads back the winner's document.
    pub async fn provision(
        &self,
        auth: &AuthUser,
        user_type: UserType,
    ) -> Result<(User, bool), AppError> {
        if let Some(user) = self.find(auth).await? {
            return Ok((user, false));
        }

        let clerk_user = self.clerk.get_user(&auth.subject).await?;
        let email = clerk_user.primary_email().ok_or_else(|| {
            tracing::warn!(subject = %auth.subject, "Clerk user has no email address");
            AppError::Unauthorized
        })?;

        let now = now_rfc3339();
        let user = User {
            id: None,
            clerk_id: auth.subject.clone(),
            email: email.to_lowercase(),
            first_name: clerk_user.first_name.clone().unwrap_or_default(),
            last_name: clerk_user.last_name.clone().unwrap_or_default(),
            image_url: clerk_user.image_url.clone(),
            location: None,
            address: Address::default(),
            user_type: Some(user_type),
            profile_complete: false,
            is_active: true,
            is_verified: false,
            preferences: Preferences::default(),
            activity: ActivityTracking {
                session_count: i64::from(auth.session_id.is_some()),
                last_session_id: auth.session_id.clone(),
                last_active_at: Some(now.clone()),
            },
            created_at: now.clone(),
            updated_at: now,
        };

        match self.db.insert_user(&user).await {
            Ok(saved) => {
                tracing::info!(
                    user_id = %saved.id_hex(),
                    subject = %auth.subject,
                    user_type = %user_type,
                    "Provisioned local user"
                );
                Ok((saved, true))
            }
            Err(AppError::Conflict(_)) => {
                let existing = self
                    .db
                    .get_user_by_clerk_id(&auth.subject)
                    .await?
                    .ok_or_else(|| {
                        AppError::Conflict("Email address already belongs to another user".into())
                    })?;
                tracing::debug!(subject = %auth.subject, "Lost provisioning race, using existing user");
                Ok((existing, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Mirror onboarding flags into Clerk public metadata.
    ///
    /// Best-effort: local documents are authoritative, so a failure is only logged.
    pub async fn mirror_metadata(&self, user: &User) {
        let mut patch = Map::new();
        patch.insert(
            "userType".to_string(),
            user.user_type
                .map(|t| Value::from(t.as_str()))
                .unwrap_or(Value::Null),
        );
        patch.insert(
            "profileComplete".to_string(),
            Value::from(user.profile_complete),
        );

        if let Err(e) = self.clerk.update_public_metadata(&user.clerk_id, patch).await {
            tracing::warn!(
                error = %e,
                subject = %user.clerk_id,
                "Failed to mirror onboarding state to Clerk metadata"
            );
        }
    }

    /// Update activity counters without read-modify-write.
    ///
    /// The loaded document is checked first so a request in an already
    /// counted session within the write interval costs no writes at all.
    async fn record_activity(&self, user: &User, session_id: Option<&str>) {
        let Some(id) = user.id else {
            return;
        };

        let now = Utc::now();
        let stale_before = format_utc_rfc3339(now - Duration::minutes(ACTIVE_WRITE_INTERVAL_MINUTES));

        if let Some(sid) = session_id {
            if user.activity.last_session_id.as_deref() != Some(sid) {
                if let Err(e) = self.db.record_session(id, sid).await {
                    tracing::warn!(error = %e, user_id = %id, "Failed to record session");
                }
            }
        }

        if needs_active_write(user.activity.last_active_at.as_deref(), &stale_before) {
            let now = format_utc_rfc3339(now);
            if let Err(e) = self.db.touch_last_active(id, &now, &stale_before).await {
                tracing::warn!(error = %e, user_id = %id, "Failed to update lastActiveAt");
            }
        }
    }
}

fn needs_active_write(last_active_at: Option<&str>, stale_before: &str) -> bool {
    last_active_at.is_none_or(|at| at < stale_before)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_active_write() {
        let threshold = "2025-03-01T12:00:00.000Z";
        assert!(needs_active_write(None, threshold));
        assert!(needs_active_write(Some("2025-03-01T11:54:59.000Z"), threshold));
        assert!(!needs_active_write(Some("2025-03-01T12:00:00.000Z"), threshold));
        assert!(!needs_active_write(Some("2025-03-01T12:03:00.000Z"), threshold));
    }

    #[tokio::test]
    async fn test_offline_find_surfaces_database_error() {
        let bridge = IdentityBridge::new(MongoDb::new_mock(), ClerkClient::new_mock());
        let auth = AuthUser {
            subject: "user_1".into(),
            session_id: None,
        };
        assert!(matches!(
            bridge.find(&auth).await,
            Err(AppError::Database(_))
        ));
    }
}
