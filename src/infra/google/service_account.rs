// =============================================================================
// SERVICE ACCOUNT AUTHENTICATION
// =============================================================================
//
// OAuth2 for Google APIs using a service account JSON key: a signed RS256 JWT
// is exchanged for an access token, which is cached until shortly before it
// expires.
//
// **Setup:**
// 1. Create a service account in Google Cloud Console and download a JSON key.
// 2. Enable the Drive, Docs and Sheets APIs for the project.
// 3. Share the call export folder, the summary root folder and the reporting
//    spreadsheet with the service account email
//    (looks like: name@project.iam.gserviceaccount.com) as Editor.
// 4. Set `GOOGLE_SERVICE_ACCOUNT_KEY` (path to the key file) or
//    `GOOGLE_SERVICE_ACCOUNT_JSON` (the key content itself, for deployment).

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::RwLock;

/// Scopes requested for every token: files, documents and spreadsheets.
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/documents",
    "https://www.googleapis.com/auth/spreadsheets",
];

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are reused for this long; Google issues them for an hour.
const TOKEN_LIFETIME: Duration = Duration::from_secs(55 * 60);
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid service account key: {0}")]
    Credentials(String),
    #[error("Token exchange failed: {0}")]
    Exchange(String),
}

/// Service account credentials from the JSON key file.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    /// The service account email (used as issuer in JWT).
    client_email: String,

    /// The private key in PEM format.
    private_key: String,

    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    /// Max 1 hour from iat.
    exp: u64,
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

/// Authenticator that handles OAuth2 with service account credentials.
pub struct ServiceAccountAuth {
    credentials: ServiceAccountCredentials,
    scopes: String,
    client: Client,
    cached_token: RwLock<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Load from a key file path, or from inline JSON when no path is given.
    pub async fn load(key_path: Option<&str>, key_json: Option<&str>) -> Result<Self, AuthError> {
        match (key_path, key_json) {
            (Some(path), _) => Self::from_file(path).await,
            (None, Some(json)) => Self::from_json(json),
            (None, None) => Err(AuthError::Credentials(
                "Neither GOOGLE_SERVICE_ACCOUNT_KEY nor GOOGLE_SERVICE_ACCOUNT_JSON is set."
                    .to_string(),
            )),
        }
    }

    pub async fn from_file(path: &str) -> Result<Self, AuthError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuthError::Credentials(format!("{path}: {e}")))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let credentials: ServiceAccountCredentials =
            serde_json::from_str(json).map_err(|e| AuthError::Credentials(e.to_string()))?;
        Ok(Self {
            credentials,
            scopes: DEFAULT_SCOPES.join(" "),
            client: Client::new(),
            cached_token: RwLock::new(None),
        })
    }

    /// Credentials whose token is already cached, for exercising callers
    /// without a token exchange.
    #[cfg(test)]
    pub fn with_cached_token(client_email: &str, token: &str) -> Self {
        Self {
            credentials: ServiceAccountCredentials {
                client_email: client_email.to_string(),
                private_key: String::new(),
                token_uri: default_token_uri(),
            },
            scopes: DEFAULT_SCOPES.join(" "),
            client: Client::new(),
            cached_token: RwLock::new(Some(CachedToken {
                token: token.to_string(),
                expires_at: SystemTime::now() + TOKEN_LIFETIME,
            })),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.credentials.client_email
    }

    /// Gets a valid access token, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String, AuthError> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > SystemTime::now() + REFRESH_MARGIN {
                    return Ok(token.token.clone());
                }
            }
        }

        let new_token = self.fetch_new_token().await?;

        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(CachedToken {
                token: new_token.clone(),
                expires_at: SystemTime::now() + TOKEN_LIFETIME,
            });
        }

        tracing::debug!(account = %self.credentials.client_email, "Refreshed Google access token");
        Ok(new_token)
    }

    fn claims(&self, now: u64) -> JwtClaims {
        JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: self.scopes.clone(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        }
    }

    async fn fetch_new_token(&self) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::Exchange(e.to_string()))?
            .as_secs();

        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| AuthError::Credentials(e.to_string()))?;
        let jwt = encode(&header, &self.claims(now), &key)
            .map_err(|e| AuthError::Credentials(e.to_string()))?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::Exchange(format!("({status}): {text}")));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;
        Ok(token_response.access_token)
    }
}
