//! Backend API configuration.

use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    "http://localhost:5001/api".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL every backend path is joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Join a path onto the base URL without doubling slashes.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_cleanly() {
        let config = ApiConfig {
            base_url: "http://host/api/".into(),
            ..Default::default()
        };
        assert_eq!(config.endpoint("/chatbot/chat"), "http://host/api/chatbot/chat");
        assert_eq!(config.endpoint("chatbot/chat"), "http://host/api/chatbot/chat");
    }
}
