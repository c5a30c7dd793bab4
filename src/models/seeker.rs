// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Seeker profile model.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::collections;
use crate::models::profile::VersionedProfile;

/// Seeker profile, one-to-one with a seeker user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeekerProfile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId,
    pub fitness_level: Option<FitnessLevel>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub workouts: Vec<Workout>,
    #[serde(default)]
    pub journey: Vec<Milestone>,
    #[serde(default)]
    pub completion_score: u32,
    #[serde(default)]
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
    Athlete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Moderate,
    High,
}

/// One entry of the embedded workout log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    #[validate(length(min = 1, max = 60, message = "must be 1-60 characters"))]
    #[serde(rename = "type")]
    pub workout_type: String,
    /// Duration in minutes
    #[validate(range(min = 1, max = 1440, message = "must be 1-1440 minutes"))]
    pub duration: i32,
    pub intensity: Intensity,
    #[serde(default)]
    pub date: Option<String>,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub metrics: WorkoutMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutMetrics {
    pub distance: Option<f64>,
    pub calories: Option<i32>,
    pub avg_heart_rate: Option<i32>,
    pub sets: Option<i32>,
    pub reps: Option<i32>,
    pub weight: Option<f64>,
}

/// A milestone on the seeker's fitness journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub title: String,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub achieved_at: Option<String>,
}

impl VersionedProfile for SeekerProfile {
    const COLLECTION: &'static str = collections::SEEKER_PROFILES;

    fn empty(user: ObjectId, now: &str) -> Self {
        Self {
            id: None,
            user,
            fitness_level: None,
            goals: vec![],
            interests: vec![],
            bio: None,
            workouts: vec![],
            journey: vec![],
            completion_score: 0,
            version: 0,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    fn id(&self) -> Option<ObjectId> {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn set_updated_at(&mut self, now: &str) {
        self.updated_at = now.to_string();
    }

    fn checklist(&self) -> Vec<(u32, bool)> {
        vec![
            (20, self.fitness_level.is_some()),
            (20, !self.goals.is_empty()),
            (20, !self.interests.is_empty()),
            (20, !self.workouts.is_empty()),
            (20, !self.journey.is_empty()),
        ]
    }

    fn set_completion_score(&mut self, score: u32) {
        self.completion_score = score;
    }
}
