//! Authorized calls to the campus backend.
//!
//! Every request carries the stored credential as a bearer header. A 401
//! clears the identity store before the error is returned to the caller; a
//! 403 and transport failures leave identity untouched.

use std::sync::Arc;
use std::time::Duration;

use campus_config::ApiConfig;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::store::IdentityStore;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
    store: Arc<IdentityStore>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be constructed.
    pub fn new(config: ApiConfig, store: Arc<IdentityStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(format!("build client: {e}")))?;
        Ok(Self {
            http,
            config,
            store,
        })
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<IdentityStore> {
        &self.store
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        self.config.endpoint(path)
    }

    /// # Errors
    ///
    /// See [`ApiError`]. A 401 has already cleared the store when this returns.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.http.get(self.endpoint(path))).await?;
        decode(response).await
    }

    /// # Errors
    ///
    /// See [`ApiError`]. A 401 has already cleared the store when this returns.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.http.post(self.endpoint(path)).json(body))
            .await?;
        decode(response).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request = match self.store.auth_header() {
            Some(header) => request.header(AUTHORIZATION, header.value()),
            None => {
                tracing::debug!("no stored credential; sending request unauthenticated");
                request
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = classify(status, body);
        match &error {
            ApiError::Unauthorized => self.handle_unauthorized(),
            ApiError::Forbidden(message) => {
                tracing::warn!(%message, "backend denied permission (403); identity kept");
            }
            _ => tracing::debug!(%error, "backend call failed"),
        }
        Err(error)
    }

    fn handle_unauthorized(&self) {
        tracing::warn!("backend rejected credential (401); clearing identity");
        if let Err(error) = self.store.clear() {
            tracing::warn!(%error, "failed to clear identity after 401");
        }
    }
}

/// Map a non-success status onto the error taxonomy.
#[must_use]
pub fn classify(status: StatusCode, body: String) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::Forbidden(message_from_body(&body)),
        _ => ApiError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

/// Backend error bodies look like `{"success":false,"message":"..."}`.
fn message_from_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(String::from))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "forbidden".to_string()
            } else {
                body.trim().to_string()
            }
        })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}
