//! Chat backend seam.
//!
//! [`HttpChatBackend`] talks to `{base}/chatbot/*` through the identity
//! layer's [`ApiClient`], so every call carries the stored bearer credential
//! and a 401 has already cleared the store by the time it surfaces here.

use std::future::Future;

use campus_core::Role;
use campus_identity::{ApiClient, ApiError};
use serde::{Deserialize, Serialize};

/// Answer from the chat endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnswer {
    pub response: String,
    #[serde(default)]
    pub is_navigation: bool,
    #[serde(default)]
    pub navigation_type: Option<String>,
}

pub trait ChatBackend: Send + Sync {
    /// Send `message` on behalf of `portal`.
    fn chat(
        &self,
        message: &str,
        portal: Role,
    ) -> impl Future<Output = Result<ChatAnswer, ApiError>> + Send;

    /// Role-scoped suggestion list.
    fn suggestions(&self, portal: Role)
    -> impl Future<Output = Result<Vec<String>, ApiError>> + Send;
}

/// `{"success": bool, "data": T, "message": "..."}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, ApiError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(ApiError::Decode(
                self.message
                    .unwrap_or_else(|| "backend reported failure".to_string()),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    context: Role,
}

#[derive(Debug, Deserialize)]
struct SuggestionList {
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    client: ApiClient,
}

impl HttpChatBackend {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub const fn client(&self) -> &ApiClient {
        &self.client
    }
}

impl ChatBackend for HttpChatBackend {
    async fn chat(&self, message: &str, portal: Role) -> Result<ChatAnswer, ApiError> {
        let request = ChatRequest {
            message,
            context: portal,
        };
        self.client
            .post_json::<_, Envelope<ChatAnswer>>("/chatbot/chat", &request)
            .await?
            .into_data()
    }

    async fn suggestions(&self, portal: Role) -> Result<Vec<String>, ApiError> {
        let path = format!(
            "/chatbot/suggestions?context={}",
            urlencoding::encode(portal.as_str())
        );
        let list = self
            .client
            .get_json::<Envelope<SuggestionList>>(&path)
            .await?
            .into_data()?;
        Ok(list.suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chat_envelope_decodes() {
        let body = r#"{"success":true,"data":{"response":"Opening attendance","isNavigation":true,"navigationType":"attendance","timestamp":"2024-01-01T00:00:00Z"}}"#;
        let answer = serde_json::from_str::<Envelope<ChatAnswer>>(body)
            .expect("decode")
            .into_data()
            .expect("data");
        assert_eq!(
            answer,
            ChatAnswer {
                response: "Opening attendance".into(),
                is_navigation: true,
                navigation_type: Some("attendance".into()),
            }
        );
    }

    #[test]
    fn unsuccessful_envelope_is_an_error() {
        let body = r#"{"success":false,"message":"Failed to process your message."}"#;
        let err = serde_json::from_str::<Envelope<ChatAnswer>>(body)
            .expect("decode")
            .into_data()
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(ref m) if m == "Failed to process your message."));
    }

    #[test]
    fn chat_request_uses_role_as_context() {
        let json = serde_json::to_value(ChatRequest {
            message: "hi",
            context: Role::Admin,
        })
        .expect("encode");
        assert_eq!(json, serde_json::json!({"message": "hi", "context": "admin"}));
    }
}
