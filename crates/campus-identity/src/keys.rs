//! Canonical storage key names.
//!
//! These are the names the campus web frontend has always persisted under,
//! so a store written by it is read here unchanged: `authToken` holds the
//! credential, `userRole` the role, `userId` the subject id and
//! `userProfile` the JSON profile.

pub const CREDENTIAL: &str = "authToken";
pub const ROLE: &str = "userRole";
pub const SUBJECT_ID: &str = "userId";
pub const PROFILE: &str = "userProfile";

/// Milliseconds since the epoch of the last credential write.
pub const CREDENTIAL_WRITTEN_AT: &str = "authToken_timestamp";

/// Monotonic counter bumped on every write and clear.
pub const VERSION: &str = "identityVersion";

/// The four identity fields, in the order they are read.
pub const IDENTITY_FIELDS: [&str; 4] = [CREDENTIAL, ROLE, SUBJECT_ID, PROFILE];

/// Credential-only key names used by earlier releases, in migration priority
/// order.
pub const DEFAULT_LEGACY_KEYS: [&str; 4] = ["token", "access_token", "accessToken", "jwt_token"];
