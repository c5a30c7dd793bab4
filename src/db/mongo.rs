// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! MongoDB client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (identity bridge, activity counters)
//! - Seeker/provider profiles (versioned compare-and-swap writes)
//! - Provider search (geospatial aggregation)
//! - External profiles (linked Strava accounts)
//! - Connections (seeker/provider edges)

use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};

use crate::db::collections;
use crate::error::{is_duplicate_key, AppError};
use crate::models::{
    Connection, ConnectionStatus, ExternalProfile, ProviderProfile, User, UserType,
    VersionedProfile,
};
use crate::services::search::{count_from_document, ProviderSearch, ProviderSummary};
use crate::time_utils::now_rfc3339;

/// Attempts at a profile compare-and-swap before giving up with 409.
pub const MAX_CAS_ATTEMPTS: usize = 5;

/// MongoDB database handle.
#[derive(Clone)]
pub struct MongoDb {
    database: Option<Database>,
}

impl MongoDb {
    /// Connect to MongoDB and select the application database.
    pub async fn new(uri: &str, database: &str) -> Result<Self, AppError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AppError::Database(format!("MongoDB ping failed: {}", e)))?;

        tracing::info!(database, "Connected to MongoDB");

        Ok(Self {
            database: Some(client.database(database)),
        })
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { database: None }
    }

    /// Whether this handle is backed by a live connection.
    pub fn is_connected(&self) -> bool {
        self.database.is_some()
    }

    fn get_database(&self) -> Result<&Database, AppError> {
        self.database
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Result<Collection<T>, AppError> {
        Ok(self.get_database()?.collection::<T>(name))
    }

    /// Drop every collection. Only used by integration tests against a
    /// throwaway database.
    pub async fn drop_database(&self) -> Result<(), AppError> {
        self.get_database()?.drop().await?;
        Ok(())
    }

    // ─── Indexes ─────────────────────────────────────────────────

    /// Create the unique and geospatial indexes the application relies on.
    ///
    /// Idempotent; safe to run on every startup.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let unique = |name: &str| {
            Some(
                IndexOptions::builder()
                    .name(Some(name.to_string()))
                    .unique(Some(true))
                    .build(),
            )
        };

        let plan: Vec<(&str, Vec<(Document, Option<IndexOptions>)>)> = vec![
            (
                collections::USERS,
                vec![
                    (doc! { "clerkId": 1 }, unique("clerk_id_unique")),
                    (doc! { "email": 1 }, unique("email_unique")),
                    (
                        doc! { "location": "2dsphere" },
                        Some(
                            IndexOptions::builder()
                                .name(Some("location_2dsphere".to_string()))
                                .build(),
                        ),
                    ),
                ],
            ),
            (
                collections::SEEKER_PROFILES,
                vec![(doc! { "user": 1 }, unique("user_unique"))],
            ),
            (
                collections::PROVIDER_PROFILES,
                vec![(doc! { "user": 1 }, unique("user_unique"))],
            ),
            (
                collections::EXTERNAL_PROFILES,
                vec![(
                    doc! { "user": 1, "platform": 1 },
                    unique("user_platform_unique"),
                )],
            ),
            (
                collections::CONNECTIONS,
                vec![
                    (
                        doc! { "seeker": 1, "provider": 1 },
                        unique("seeker_provider_unique"),
                    ),
                    (doc! { "provider": 1, "createdAt": -1 }, None),
                ],
            ),
        ];

        for (collection, indexes) in plan {
            let models: Vec<IndexModel> = indexes
                .into_iter()
                .map(|(keys, options)| IndexModel::builder().keys(keys).options(options).build())
                .collect();
            let count = models.len();
            self.collection::<Document>(collection)?
                .create_indexes(models)
                .await?;
            tracing::debug!(collection, count, "Indexes ensured");
        }

        Ok(())
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Look up the local user for a Clerk user ID.
    pub async fn get_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .collection::<User>(collections::USERS)?
            .find_one(doc! { "clerkId": clerk_id })
            .await?)
    }

    pub async fn get_user(&self, id: ObjectId) -> Result<Option<User>, AppError> {
        Ok(self
            .collection::<User>(collections::USERS)?
            .find_one(doc! { "_id": id })
            .await?)
    }

    /// Insert a new user, returning it with its assigned ID.
    ///
    /// Unique index violations surface as `AppError::Conflict`.
    pub async fn insert_user(&self, user: &User) -> Result<User, AppError> {
        let result = self
            .collection::<User>(collections::USERS)?
            .insert_one(user)
            .await?;

        let mut saved = user.clone();
        saved.id = result.inserted_id.as_object_id();
        Ok(saved)
    }

    /// Apply `$set` / `$unset` fields to a user and return the updated document.
    ///
    /// `updatedAt` is always refreshed.
    pub async fn update_user(
        &self,
        id: ObjectId,
        mut set: Document,
        unset: Document,
    ) -> Result<Option<User>, AppError> {
        set.insert("updatedAt", now_rfc3339());
        let mut update = doc! { "$set": set };
        if !unset.is_empty() {
            update.insert("$unset", unset);
        }

        Ok(self
            .collection::<User>(collections::USERS)?
            .find_one_and_update(doc! { "_id": id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// Count a new session for the user.
    ///
    /// The increment only applies when `session_id` differs from the stored
    /// one, so concurrent requests in the same session count once. Returns
    /// whether the counter moved.
    pub async fn record_session(&self, id: ObjectId, session_id: &str) -> Result<bool, AppError> {
        let result = self
            .collection::<Document>(collections::USERS)?
            .update_one(
                doc! { "_id": id, "activity.lastSessionId": { "$ne": session_id } },
                doc! {
                    "$inc": { "activity.sessionCount": 1_i64 },
                    "$set": { "activity.lastSessionId": session_id },
                },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    /// Set `lastActiveAt` to `now` unless it is already at or after `stale_before`.
    pub async fn touch_last_active(
        &self,
        id: ObjectId,
        now: &str,
        stale_before: &str,
    ) -> Result<bool, AppError> {
        let result = self
            .collection::<Document>(collections::USERS)?
            .update_one(
                doc! {
                    "_id": id,
                    "$or": [
                        { "activity.lastActiveAt": { "$exists": false } },
                        { "activity.lastActiveAt": Bson::Null },
                        { "activity.lastActiveAt": { "$lt": stale_before } },
                    ],
                },
                doc! { "$set": { "activity.lastActiveAt": now } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get the profile of type `P` for a user.
    pub async fn get_profile<P: VersionedProfile>(
        &self,
        user: ObjectId,
    ) -> Result<Option<P>, AppError> {
        Ok(self
            .collection::<P>(P::COLLECTION)?
            .find_one(doc! { "user": user })
            .await?)
    }

    /// Whether a profile of type `P` exists for a user.
    pub async fn has_profile<P: VersionedProfile>(&self, user: ObjectId) -> Result<bool, AppError> {
        let count = self
            .collection::<Document>(P::COLLECTION)?
            .count_documents(doc! { "user": user })
            .await?;
        Ok(count > 0)
    }

    /// Create the user's profile if missing, without touching an existing one.
    pub async fn ensure_profile<P: VersionedProfile>(&self, user: ObjectId) -> Result<P, AppError> {
        self.update_profile::<P, _>(user, |_| Ok(())).await
    }

    /// Read-modify-write a profile with optimistic concurrency.
    ///
    /// `apply` mutates the current document (or an empty one when the user has
    /// no profile yet). The completion score is recomputed, the version is
    /// bumped and the write only lands if nobody else wrote in between; on a
    /// lost race the whole cycle is retried up to `MAX_CAS_ATTEMPTS` times.
    pub async fn update_profile<P, F>(&self, user: ObjectId, mut apply: F) -> Result<P, AppError>
    where
        P: VersionedProfile,
        F: FnMut(&mut P) -> Result<(), AppError> + Send,
    {
        let collection = self.collection::<P>(P::COLLECTION)?;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let now = now_rfc3339();
            let current = collection.find_one(doc! { "user": user }).await?;

            match current {
                Some(mut profile) => {
                    let expected = profile.version();
                    apply(&mut profile)?;
                    profile.refresh_completion_score();
                    profile.set_version(expected + 1);
                    profile.set_updated_at(&now);

                    let id = profile.id().ok_or_else(|| {
                        AppError::Database("Stored profile has no _id".to_string())
                    })?;
                    let result = collection
                        .replace_one(version_filter(id, expected), &profile)
                        .await?;
                    if result.matched_count == 1 {
                        return Ok(profile);
                    }
                }
                None => {
                    let mut profile = P::empty(user, &now);
                    apply(&mut profile)?;
                    profile.refresh_completion_score();
                    profile.set_version(1);

                    match collection.insert_one(&profile).await {
                        Ok(result) => {
                            if let Some(id) = result.inserted_id.as_object_id() {
                                profile.set_id(id);
                            }
                            return Ok(profile);
                        }
                        Err(e) if is_duplicate_key(&e) => {}
                        Err(e) => return Err(e.into()),
                    }
                }
            }

            tracing::debug!(
                collection = P::COLLECTION,
                user = %user,
                attempt,
                "Profile write lost a race, retrying"
            );
        }

        tracing::warn!(
            collection = P::COLLECTION,
            user = %user,
            "Profile write gave up after repeated conflicts"
        );
        Err(AppError::Conflict(
            "Profile was modified concurrently, please retry".to_string(),
        ))
    }

    // ─── Search Operations ───────────────────────────────────────

    /// Run a provider search, returning one page and the total match count.
    ///
    /// Both pipelines run concurrently against the same filter prefix.
    pub async fn search_providers(
        &self,
        search: &ProviderSearch,
    ) -> Result<(Vec<ProviderSummary>, u64), AppError> {
        let users = self.collection::<Document>(collections::USERS)?;

        let page = async {
            let docs: Vec<Document> = users
                .aggregate(search.page_pipeline())
                .await?
                .try_collect()
                .await?;
            docs.into_iter()
                .map(|d| bson::from_document::<ProviderSummary>(d).map_err(AppError::from))
                .collect::<Result<Vec<_>, AppError>>()
        };

        let count = async {
            let docs: Vec<Document> = users
                .aggregate(search.count_pipeline())
                .await?
                .try_collect()
                .await?;
            Ok::<_, AppError>(count_from_document(docs.first()))
        };

        tokio::try_join!(page, count)
    }

    /// Public view of one active provider and their profile.
    pub async fn get_provider(
        &self,
        id: ObjectId,
    ) -> Result<Option<(User, Option<ProviderProfile>)>, AppError> {
        let user = self
            .collection::<User>(collections::USERS)?
            .find_one(doc! {
                "_id": id,
                "userType": UserType::Provider.as_str(),
                "isActive": true,
            })
            .await?;

        match user {
            Some(user) => {
                let profile = self.get_profile::<ProviderProfile>(id).await?;
                Ok(Some((user, profile)))
            }
            None => Ok(None),
        }
    }

    // ─── External Profile Operations ─────────────────────────────

    /// Create or replace the linked account for (user, platform).
    ///
    /// `connectedAt` keeps its original value on re-link.
    pub async fn upsert_external_profile(
        &self,
        profile: &ExternalProfile,
    ) -> Result<(), AppError> {
        let mut set = bson::to_document(profile)?;
        set.remove("_id");
        let connected_at = set.remove("connectedAt").unwrap_or(Bson::Null);

        self.collection::<Document>(collections::EXTERNAL_PROFILES)?
            .update_one(
                doc! { "user": profile.user, "platform": &profile.platform },
                doc! {
                    "$set": set,
                    "$setOnInsert": { "connectedAt": connected_at },
                },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    pub async fn list_external_profiles(
        &self,
        user: ObjectId,
    ) -> Result<Vec<ExternalProfile>, AppError> {
        Ok(self
            .collection::<ExternalProfile>(collections::EXTERNAL_PROFILES)?
            .find(doc! { "user": user })
            .sort(doc! { "platform": 1 })
            .await?
            .try_collect()
            .await?)
    }

    /// Remove a linked account, returning the removed document.
    pub async fn delete_external_profile(
        &self,
        user: ObjectId,
        platform: &str,
    ) -> Result<Option<ExternalProfile>, AppError> {
        Ok(self
            .collection::<ExternalProfile>(collections::EXTERNAL_PROFILES)?
            .find_one_and_delete(doc! { "user": user, "platform": platform })
            .await?)
    }

    // ─── Connection Operations ───────────────────────────────────

    /// Insert a connection. A second edge for the same pair is a `Conflict`.
    pub async fn insert_connection(&self, connection: &Connection) -> Result<Connection, AppError> {
        let result = self
            .collection::<Connection>(collections::CONNECTIONS)?
            .insert_one(connection)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    AppError::Conflict("A connection between these users already exists".into())
                } else {
                    e.into()
                }
            })?;

        let mut saved = connection.clone();
        saved.id = result.inserted_id.as_object_id();
        Ok(saved)
    }

    pub async fn get_connection(&self, id: ObjectId) -> Result<Option<Connection>, AppError> {
        Ok(self
            .collection::<Connection>(collections::CONNECTIONS)?
            .find_one(doc! { "_id": id })
            .await?)
    }

    /// Connections the user participates in, newest first.
    pub async fn list_connections(
        &self,
        user: ObjectId,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Connection>, AppError> {
        let mut filter = doc! { "$or": [{ "seeker": user }, { "provider": user }] };
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }

        Ok(self
            .collection::<Connection>(collections::CONNECTIONS)?
            .find(filter)
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .await?
            .try_collect()
            .await?)
    }

    /// Move a connection from `from` to `to`.
    ///
    /// Returns `None` when the stored status is no longer `from`.
    pub async fn update_connection_status(
        &self,
        id: ObjectId,
        from: ConnectionStatus,
        to: ConnectionStatus,
    ) -> Result<Option<Connection>, AppError> {
        Ok(self
            .collection::<Connection>(collections::CONNECTIONS)?
            .find_one_and_update(
                doc! { "_id": id, "status": from.as_str() },
                doc! { "$set": { "status": to.as_str(), "updatedAt": now_rfc3339() } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }
}

/// Filter matching a profile at an expected version. Documents written before
/// versioning have no `version` field and count as version 0.
fn version_filter(id: ObjectId, expected: i64) -> Document {
    if expected == 0 {
        doc! {
            "_id": id,
            "$or": [{ "version": 0_i64 }, { "version": { "$exists": false } }],
        }
    } else {
        doc! { "_id": id, "version": expected }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeekerProfile;

    #[tokio::test]
    async fn test_offline_operations_fail_cleanly() {
        let db = MongoDb::new_mock();
        assert!(!db.is_connected());

        let err = db.get_user_by_clerk_id("user_1").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        let err = db
            .update_profile::<SeekerProfile, _>(ObjectId::new(), |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_version_filter() {
        let id = ObjectId::new();
        let f = version_filter(id, 3);
        assert_eq!(f.get_i64("version").unwrap(), 3);

        let f = version_filter(id, 0);
        assert!(f.get_array("$or").is_ok());
        assert!(!f.contains_key("version"));
    }
}
