// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider profile model.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use crate::db::collections;
use crate::models::profile::{has_text, VersionedProfile};

/// Kind of business a provider runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Trainer,
    Coach,
    Gym,
    Club,
    EventOrganizer,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Trainer => "trainer",
            ProviderType::Coach => "coach",
            ProviderType::Gym => "gym",
            ProviderType::Club => "club",
            ProviderType::EventOrganizer => "event_organizer",
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trainer" => Ok(ProviderType::Trainer),
            "coach" => Ok(ProviderType::Coach),
            "gym" => Ok(ProviderType::Gym),
            "club" => Ok(ProviderType::Club),
            "event_organizer" => Ok(ProviderType::EventOrganizer),
            other => Err(format!("unknown provider type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Pending,
    Verified,
    Rejected,
}

/// Provider profile, one-to-one with a provider user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId,
    pub bio: Option<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    pub provider_type: Option<ProviderType>,
    pub experience_years: Option<i32>,
    #[serde(default)]
    pub credentials: Vec<Credential>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub business_hours: Vec<BusinessHours>,
    #[serde(default)]
    pub gallery: Vec<GalleryItem>,
    #[serde(default)]
    pub verification_documents: Vec<VerificationDocument>,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub completion_score: u32,
    #[serde(default)]
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub organization: String,
    #[validate(range(min = 1900, max = 2100, message = "must be a valid year"))]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    InPerson,
    Online,
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub title: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Opening hours for one weekday (`HH:MM`, 24h).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHours {
    pub day: Weekday,
    #[serde(default)]
    pub closed: bool,
    pub open: Option<String>,
    pub close: Option<String>,
}

impl BusinessHours {
    /// Open days need both times, in order; closed days need neither.
    pub fn is_consistent(&self) -> bool {
        if self.closed {
            return self.open.is_none() && self.close.is_none();
        }
        match (
            self.open.as_deref().and_then(parse_hhmm),
            self.close.as_deref().and_then(parse_hhmm),
        ) {
            (Some(open), Some(close)) => open < close,
            _ => false,
        }
    }
}

fn parse_hhmm(value: &str) -> Option<u32> {
    let (h, m) = value.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h < 24 && m < 60).then_some(h * 60 + m)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    #[validate(url(message = "must be a valid URL"))]
    pub url: String,
    #[validate(length(max = 300, message = "must be at most 300 characters"))]
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDocument {
    #[validate(length(min = 1, max = 60, message = "must be 1-60 characters"))]
    pub document_type: String,
    #[validate(url(message = "must be a valid URL"))]
    pub url: String,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

impl VersionedProfile for ProviderProfile {
    const COLLECTION: &'static str = collections::PROVIDER_PROFILES;

    fn empty(user: ObjectId, now: &str) -> Self {
        Self {
            id: None,
            user,
            bio: None,
            specialties: vec![],
            provider_type: None,
            experience_years: None,
            credentials: vec![],
            services: vec![],
            business_hours: vec![],
            gallery: vec![],
            verification_documents: vec![],
            verification_status: VerificationStatus::Unverified,
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
            (15, has_text(&self.bio)),
            (15, !self.specialties.is_empty()),
            (10, self.provider_type.is_some()),
            (10, self.experience_years.is_some()),
            (15, !self.credentials.is_empty()),
            (15, !self.services.is_empty()),
            (10, !self.business_hours.is_empty()),
            (5, !self.gallery.is_empty()),
            (5, !self.verification_documents.is_empty()),
        ]
    }

    fn set_completion_score(&mut self, score: u32) {
        self.completion_score = score;
    }
}
