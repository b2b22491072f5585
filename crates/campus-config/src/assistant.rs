//! Assistant widget settings.

use campus_core::Role;
use serde::{Deserialize, Serialize};

const fn default_poll_interval_ms() -> u64 {
    5_000
}

const fn default_guest_sessions() -> bool {
    true
}

const fn default_portal() -> Role {
    Role::Student
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantConfig {
    /// How often the assistant re-reads the identity store.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Whether a guest identity may be synthesized when the page implies a role.
    #[serde(default = "default_guest_sessions")]
    pub guest_sessions: bool,

    /// Portal used for greetings and quick actions before any role is known.
    #[serde(default = "default_portal")]
    pub portal: Role,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            guest_sessions: default_guest_sessions(),
            portal: default_portal(),
        }
    }
}

impl AssistantConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = AssistantConfig::default();
        assert_eq!(config.poll_interval(), std::time::Duration::from_secs(5));
        assert!(config.guest_sessions);
        assert_eq!(config.portal, Role::Student);
    }
}
