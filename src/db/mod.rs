//! Database layer (MongoDB).

pub mod mongo;

pub use mongo::MongoDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SEEKER_PROFILES: &str = "seeker_profiles";
    pub const PROVIDER_PROFILES: &str = "provider_profiles";
    /// Linked third-party accounts (unique per user + platform)
    pub const EXTERNAL_PROFILES: &str = "external_profiles";
    /// Seeker/provider edges (unique per pair)
    pub const CONNECTIONS: &str = "connections";
}
