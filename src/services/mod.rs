// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod clerk;
pub mod crypto;
pub mod geocode;
pub mod identity;
pub mod onboarding;
pub mod search;
pub mod session;
pub mod strava;

pub use clerk::ClerkClient;
pub use crypto::TokenCipher;
pub use geocode::Geocoder;
pub use identity::IdentityBridge;
pub use session::{SessionError, SessionVerifier, VerifiedSession};
pub use strava::{StravaClient, StravaService};
