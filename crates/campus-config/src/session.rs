//! Session lifetime settings.

use serde::{Deserialize, Serialize};

const fn default_credential_max_age_days() -> u32 {
    7
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Age after which a stored credential is reported stale. Matches the
    /// backend's token lifetime. Diagnostic only.
    #[serde(default = "default_credential_max_age_days")]
    pub credential_max_age_days: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credential_max_age_days: default_credential_max_age_days(),
        }
    }
}
