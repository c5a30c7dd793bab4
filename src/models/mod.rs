// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod connection;
pub mod external_profile;
pub mod location;
pub mod profile;
pub mod provider;
pub mod seeker;
pub mod user;

pub use connection::{Connection, ConnectionStatus};
pub use external_profile::ExternalProfile;
pub use location::{Address, GeoPoint};
pub use profile::VersionedProfile;
pub use provider::{ProviderProfile, ProviderType, VerificationStatus};
pub use seeker::SeekerProfile;
pub use user::{User, UserType};
