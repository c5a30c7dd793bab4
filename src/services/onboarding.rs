// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side onboarding state.
//!
//! The state is derived from stored documents on every request, never from
//! session claims, so it is correct as soon as the write that changed it
//! returns.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::MongoDb;
use crate::error::AppError;
use crate::models::{ProviderProfile, SeekerProfile, User, UserType};

pub const PAGE_SELECT_TYPE: &str = "/onboarding/type";
pub const PAGE_PROFILE: &str = "/onboarding/profile";
pub const PAGE_DASHBOARD: &str = "/dashboard";

/// Where a user is in onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum OnboardingState {
    /// No local user, or no user type chosen yet
    NoType,
    /// Type chosen, no profile document yet
    TypeSelected,
    /// Profile document written but the user is not flagged complete
    ProfileIncomplete,
    ProfileComplete,
}

impl OnboardingState {
    pub fn derive(user: Option<&User>, has_profile: bool) -> Self {
        let Some(user) = user else {
            return OnboardingState::NoType;
        };

        match (user.user_type, has_profile, user.profile_complete) {
            (None, _, _) => OnboardingState::NoType,
            (Some(_), false, _) => OnboardingState::TypeSelected,
            (Some(_), true, false) => OnboardingState::ProfileIncomplete,
            (Some(_), true, true) => OnboardingState::ProfileComplete,
        }
    }

    /// Page the client belongs on in this state.
    pub fn next_page(self) -> &'static str {
        match self {
            OnboardingState::NoType => PAGE_SELECT_TYPE,
            OnboardingState::TypeSelected | OnboardingState::ProfileIncomplete => PAGE_PROFILE,
            OnboardingState::ProfileComplete => PAGE_DASHBOARD,
        }
    }

    pub fn is_complete(self) -> bool {
        self == OnboardingState::ProfileComplete
    }

    /// Page to redirect to when the client is on `current`, if any.
    ///
    /// Users still onboarding belong on exactly one page. Onboarded users may
    /// go anywhere except back into onboarding.
    pub fn redirect_from(self, current: &str) -> Option<&'static str> {
        let current = normalize_page(current);
        let next = self.next_page();

        if self.is_complete() {
            (current == "/onboarding" || current.starts_with("/onboarding/")).then_some(next)
        } else {
            (current != next).then_some(next)
        }
    }
}

fn normalize_page(page: &str) -> &str {
    let path = page.split(['?', '#']).next().unwrap_or_default();
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// Onboarding status returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OnboardingStatus {
    pub state: OnboardingState,
    pub next: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl OnboardingStatus {
    pub fn new(state: OnboardingState, current_page: Option<&str>) -> Self {
        Self {
            state,
            next: state.next_page().to_string(),
            redirect: current_page
                .and_then(|page| state.redirect_from(page))
                .map(str::to_string),
        }
    }
}

/// Derive the state for `user`, repairing a half-finished profile submission.
///
/// A profile document without `profileComplete` on the user means the last
/// submission stopped after writing the profile; the flag is set here so the
/// user is not sent back through the wizard.
pub async fn resolve(
    db: &MongoDb,
    user: Option<User>,
) -> Result<(OnboardingState, Option<User>), AppError> {
    let Some(user) = user else {
        return Ok((OnboardingState::NoType, None));
    };
    let Some(id) = user.id else {
        return Ok((OnboardingState::derive(Some(&user), false), Some(user)));
    };

    let has_profile = match user.user_type {
        Some(UserType::Seeker) => db.has_profile::<SeekerProfile>(id).await?,
        Some(UserType::Provider) => db.has_profile::<ProviderProfile>(id).await?,
        None => false,
    };

    let state = OnboardingState::derive(Some(&user), has_profile);
    if state != OnboardingState::ProfileIncomplete {
        return Ok((state, Some(user)));
    }

    tracing::info!(user_id = %id, "Repairing profileComplete flag after partial update");
    let repaired = db
        .update_user(
            id,
            mongodb::bson::doc! { "profileComplete": true },
            mongodb::bson::Document::new(),
        )
        .await?;

    let state = OnboardingState::derive(repaired.as_ref(), true);
    Ok((state, repaired.or(Some(user))))
}
