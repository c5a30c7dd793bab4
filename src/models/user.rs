//! User model for storage and API.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::location::{Address, GeoPoint};

/// Which side of the marketplace a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Seeker,
    Provider,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Seeker => "seeker",
            UserType::Provider => "provider",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seeker" => Ok(UserType::Seeker),
            "provider" => Ok(UserType::Provider),
            other => Err(format!("unknown user type '{}'", other)),
        }
    }
}

/// Local user document, one per Clerk user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Clerk user ID (`user_...`), unique
    pub clerk_id: String,
    /// Primary email address, unique
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub image_url: Option<String>,
    /// Resolved coordinates; absent until the address geocodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub address: Address,
    pub user_type: Option<UserType>,
    #[serde(default)]
    pub profile_complete: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub activity: ActivityTracking,
    pub created_at: String,
    pub updated_at: String,
}

fn default_true() -> bool {
    true
}

impl User {
    /// Object id as a hex string (empty for unsaved users).
    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

/// Per-user request activity counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTracking {
    #[serde(default)]
    pub session_count: i64,
    pub last_session_id: Option<String>,
    pub last_active_at: Option<String>,
}

/// Embedded user preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub notifications: NotificationPreferences,
    #[serde(default)]
    pub privacy: PrivacyPreferences,
    #[serde(default)]
    pub units: Units,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications: NotificationPreferences::default(),
            privacy: PrivacyPreferences::default(),
            units: Units::Imperial,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub email: bool,
    pub push: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            push: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyPreferences {
    pub show_location: bool,
    pub profile_visibility: Visibility,
}

impl Default for PrivacyPreferences {
    fn default() -> Self {
        Self {
            show_location: true,
            profile_visibility: Visibility::Public,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    /// Visible to connected users only; never listed publicly.
    Connections,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Connections => "connections",
            Visibility::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Imperial,
    Metric,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_type_parse() {
        assert_eq!("seeker".parse::<UserType>(), Ok(UserType::Seeker));
        assert_eq!("provider".parse::<UserType>(), Ok(UserType::Provider));
        assert!("admin".parse::<UserType>().is_err());
        assert!("Seeker".parse::<UserType>().is_err());
    }

    #[test]
    fn test_user_defaults_from_sparse_document() {
        let json = serde_json::json!({
            "clerkId": "user_1",
            "email": "a@example.com",
            "imageUrl": null,
            "userType": null,
            "createdAt": "2025-01-01T00:00:00.000Z",
            "updatedAt": "2025-01-01T00:00:00.000Z"
        });
        let user: User = serde_json::from_value(json).unwrap();
        assert!(user.is_active);
        assert!(!user.profile_complete);
        assert!(user.location.is_none());
        assert_eq!(user.preferences.units, Units::Imperial);
        assert_eq!(user.activity.session_count, 0);
    }
}
