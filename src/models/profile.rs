// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Behaviour shared by the type-specific profile documents.

use mongodb::bson::oid::ObjectId;
use serde::{de::DeserializeOwned, Serialize};

/// A profile document owned by exactly one user.
///
/// Writes go through compare-and-swap on `version`; the completion score is
/// recomputed from the whole document before every write.
pub trait VersionedProfile: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    /// Collection the profile lives in.
    const COLLECTION: &'static str;

    /// Empty profile for a user that has none yet.
    fn empty(user: ObjectId, now: &str) -> Self;

    fn id(&self) -> Option<ObjectId>;
    fn set_id(&mut self, id: ObjectId);
    fn version(&self) -> i64;
    fn set_version(&mut self, version: i64);
    fn set_updated_at(&mut self, now: &str);

    /// Weighted completion checklist: `(weight, populated)` pairs.
    fn checklist(&self) -> Vec<(u32, bool)>;

    fn set_completion_score(&mut self, score: u32);

    /// Sum of the weights of populated checklist items, clamped to 0..=100.
    fn compute_completion_score(&self) -> u32 {
        let score: u32 = self
            .checklist()
            .into_iter()
            .filter(|(_, populated)| *populated)
            .map(|(weight, _)| weight)
            .sum();
        score.min(100)
    }

    fn refresh_completion_score(&mut self) {
        let score = self.compute_completion_score();
        self.set_completion_score(score);
    }
}

/// Whether an optional string has non-whitespace content.
pub(crate) fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}
