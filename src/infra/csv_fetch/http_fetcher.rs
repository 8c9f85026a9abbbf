use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::core::csv_sync::{CsvFetcher, CsvSyncError};
use crate::infra::google::ServiceAccountAuth;

/// Fetches published CSVs. When a link turns out not to be public (401/403)
/// the request is retried once with the service account's bearer token, which
/// covers Drive export links shared with that account.
pub struct HttpCsvFetcher {
    client: Client,
    auth: Option<Arc<ServiceAccountAuth>>,
}

impl HttpCsvFetcher {
    pub fn new(auth: Option<Arc<ServiceAccountAuth>>) -> Self {
        Self::with_client(Client::new(), auth)
    }

    fn with_client(client: Client, auth: Option<Arc<ServiceAccountAuth>>) -> Self {
        Self { client, auth }
    }

    async fn get(&self, url: &str, token: Option<&str>) -> Result<(StatusCode, String), CsvSyncError> {
        let network = |e: reqwest::Error| CsvSyncError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };

        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(network)?;
        let status = response.status();
        let body = response.text().await.map_err(network)?;
        Ok((status, body))
    }
}

fn needs_credentials(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

fn expect_ok(status: StatusCode, body: String, url: &str) -> Result<String, CsvSyncError> {
    if status == StatusCode::OK {
        Ok(body)
    } else {
        Err(CsvSyncError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl CsvFetcher for HttpCsvFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CsvSyncError> {
        let (status, body) = self.get(url, None).await?;

        match (&self.auth, needs_credentials(status)) {
            (Some(auth), true) => {
                tracing::debug!(url, %status, "Retrying CSV fetch with service account token");
                let token = auth.get_access_token().await.map_err(|e| CsvSyncError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
                let (status, body) = self.get(url, Some(&token)).await?;
                expect_ok(status, body, url)
            }
            _ => expect_ok(status, body, url),
        }
    }
}
