// Thin authenticated JSON transport shared by the Drive, Docs and Sheets
// clients. Every request carries a fresh-enough bearer token from the
// service account.

use std::sync::Arc;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::service_account::ServiceAccountAuth;

#[derive(Debug, Error)]
pub enum ApiFailure {
    #[error("{0}")]
    Auth(String),
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiFailure {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiFailure::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

#[derive(Clone)]
pub struct GoogleApi {
    client: Client,
    auth: Arc<ServiceAccountAuth>,
}

impl GoogleApi {
    pub fn new(auth: Arc<ServiceAccountAuth>) -> Self {
        Self {
            client: Client::new(),
            auth,
        }
    }

    /// Send a request and return the raw response body.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<String, ApiFailure> {
        let token = self
            .auth
            .get_access_token()
            .await
            .map_err(|e| ApiFailure::Auth(e.to_string()))?;

        let mut request = self
            .client
            .request(method.clone(), url)
            .query(query)
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(%method, url, "Google API request");
        let response = request
            .send()
            .await
            .map_err(|e| ApiFailure::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiFailure::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiFailure::Status { status, body: text });
        }
        Ok(text)
    }

    /// Send a request and decode the JSON response.
    pub async fn json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<T, ApiFailure> {
        let text = self.send(method, url, query, body).await?;
        serde_json::from_str(&text).map_err(|e| ApiFailure::Decode(format!("{e}; body: {text}")))
    }
}
