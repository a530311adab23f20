// Object storage client for the Google Cloud Storage JSON API.
// Uploads are single-shot `uploadType=media` requests; the returned URL is
// the public object URL the app and the scoring service read from.

use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::StorageConfig;

const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
// Refresh a little before Google says the token dies
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Cannot read service account key {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid service account key: {0}")]
    InvalidKey(String),

    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Storage answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),
}

/// The fields of a Google service-account JSON key that the JWT bearer flow needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

enum Credentials {
    /// Emulators and public test buckets
    Anonymous,
    Static(String),
    ServiceAccount {
        key: ServiceAccountKey,
        signing_key: EncodingKey,
        cached: Mutex<Option<CachedToken>>,
    },
}

pub struct ObjectStorage {
    http: reqwest::Client,
    bucket: String,
    upload_endpoint: String,
    public_url: String,
    credentials: Credentials,
}

impl ObjectStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let credentials = if let Some(token) = &config.access_token {
            Credentials::Static(token.clone())
        } else if let Some(path) = &config.key_file {
            let key = load_service_account_key(path)?;
            let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
                .map_err(|e| StorageError::InvalidKey(e.to_string()))?;
            Credentials::ServiceAccount { key, signing_key, cached: Mutex::new(None) }
        } else {
            Credentials::Anonymous
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            bucket: config.bucket.clone(),
            upload_endpoint: config.upload_endpoint.clone(),
            public_url: config.public_url.clone(),
            credentials,
        })
    }

    pub fn public_url(&self, object_name: &str) -> String {
        format!("{}/{}/{}", self.public_url, self.bucket, object_name)
    }

    /// Stores `bytes` under `object_name` and returns its public URL.
    pub async fn upload(&self, object_name: &str, content_type: &str, bytes: Bytes) -> Result<String, StorageError> {
        let size = bytes.len();
        let url = format!("{}/upload/storage/v1/b/{}/o", self.upload_endpoint, self.bucket);

        let mut request = self
            .http
            .post(&url)
            .query(&[("uploadType", "media"), ("name", object_name)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);

        if let Some(token) = self.bearer_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected { status: status.as_u16(), body });
        }

        info!("Uploaded {} ({} bytes) to bucket {}", object_name, size, self.bucket);
        Ok(self.public_url(object_name))
    }

    async fn bearer_token(&self) -> Result<Option<String>, StorageError> {
        match &self.credentials {
            Credentials::Anonymous => Ok(None),
            Credentials::Static(token) => Ok(Some(token.clone())),
            Credentials::ServiceAccount { key, signing_key, cached } => {
                let mut cached = cached.lock().await;
                if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
                    return Ok(Some(token.value.clone()));
                }

                let fresh = self.exchange_token(key, signing_key).await?;
                let value = fresh.value.clone();
                *cached = Some(fresh);
                Ok(Some(value))
            }
        }
    }

    /// OAuth 2.0 JWT bearer grant: sign an assertion with the service
    /// account key and trade it for an access token.
    async fn exchange_token(&self, key: &ServiceAccountKey, signing_key: &EncodingKey) -> Result<CachedToken, StorageError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: STORAGE_SCOPE,
            aud: &key.token_uri,
            iat,
            exp: iat + 3600,
        };

        let assertion = encode(&Header::new(Algorithm::RS256), &claims, signing_key)
            .map_err(|e| StorageError::TokenExchange(format!("cannot sign assertion: {}", e)))?;

        let response = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::TokenExchange(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        debug!("Obtained storage access token valid for {}s", token.expires_in);

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}

fn load_service_account_key(path: &Path) -> Result<ServiceAccountKey, StorageError> {
    let raw = std::fs::read_to_string(path).map_err(|source| StorageError::KeyFile {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|e| StorageError::InvalidKey(e.to_string()))
}

fn random_suffix() -> u128 {
    Uuid::new_v4().as_u128() % 1_000_000_000
}

/// `<millis><infix><random>`, e.g. `1700000000000-482913377` for profile
/// images or `1700000000000content482913377` for article bodies.
pub fn random_object_name(infix: &str) -> String {
    format!("{}{}{}", Utc::now().timestamp_millis(), infix, random_suffix())
}

/// `<millis>-<original file name>` with anything outside `[A-Za-z0-9._-]`
/// replaced, so the name is safe inside a URL path.
pub fn submission_object_name(original: Option<&str>) -> String {
    let sanitized: String = original
        .unwrap_or_default()
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "._-".contains(c) { c } else { '_' })
        .collect();

    let sanitized = sanitized.trim_start_matches('.');
    let sanitized = if sanitized.is_empty() { "upload" } else { sanitized };

    format!("{}-{}", Utc::now().timestamp_millis(), sanitized)
}
