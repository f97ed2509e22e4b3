use crate::config::Config;
use crate::product::{map_rows, Product, RowShapeError};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// OAuth scope for read-only sheet access.
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

/// Google OAuth2 token endpoint (also the JWT audience).
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Grant type for the service-account JWT exchange.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Substring identifying an upstream rate-limit failure.
const QUOTA_SIGNATURE: &str = "Quota exceeded";

/// Maximum fetch attempts for quota errors (first try included).
const MAX_FETCH_ATTEMPTS: u32 = 3;

/// Backoff before the first quota retry; doubles per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// A failed catalogue retrieval
///
/// Every failure is tagged so callers can tell an empty catalogue from a
/// broken fetch. Quota errors carry the upstream message and, once retries
/// are exhausted, their own variant.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream rejected or failed the request (non-transport)
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Rate-limit errors persisted through every retry
    #[error("quota exhausted after {attempts} attempts: {message}")]
    QuotaExhausted {
        /// Total attempts made, first try included
        attempts: u32,

        /// Upstream message from the final attempt
        message: String,
    },

    /// Service-account key or token exchange problem
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure talking to the provider
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The sheet no longer matches the 15-column catalogue schema
    #[error(transparent)]
    Schema(#[from] RowShapeError),
}

impl FetchError {
    /// Whether this failure carries the upstream quota signature
    pub fn is_quota(&self) -> bool {
        match self {
            FetchError::Upstream(message) => message.contains(QUOTA_SIGNATURE),
            _ => false,
        }
    }
}

/// Source of raw catalogue rows
///
/// The one seam between the retry/mapping pipeline and the network: the
/// production implementation is [`SheetsClient`], tests script their own.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetch all data rows (header excluded) from the backing sheet
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, FetchError>;
}

/// Fetch and map the full product list, retrying quota errors
///
/// Quota failures (message contains `"Quota exceeded"`) are retried with
/// exponential backoff up to [`MAX_FETCH_ATTEMPTS`] total attempts, then
/// surfaced as [`FetchError::QuotaExhausted`]. Any other failure is logged
/// and returned on the first occurrence.
///
/// # Arguments
/// * `source` - Row source to fetch from
///
/// # Returns
/// * `Result<Vec<Product>, FetchError>` - The mapped catalogue, or why the
///   fetch failed
pub async fn fetch_products<S: RowSource + ?Sized>(source: &S) -> Result<Vec<Product>, FetchError> {
    let mut attempt: u32 = 1;
    loop {
        match source.fetch_rows().await {
            Ok(rows) => {
                let products = map_rows(&rows)?;
                log::debug!("fetched {} products from sheet", products.len());
                return Ok(products);
            }
            Err(err) if err.is_quota() => {
                if attempt >= MAX_FETCH_ATTEMPTS {
                    return Err(FetchError::QuotaExhausted {
                        attempts: attempt,
                        message: err.to_string(),
                    });
                }
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                log::warn!(
                    "sheet quota exceeded (attempt {attempt}/{MAX_FETCH_ATTEMPTS}), retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                log::error!("sheet fetch failed: {err}");
                return Err(err);
            }
        }
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: u64,
    iat: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Authenticated Google Sheets client for the catalogue sheet
///
/// Signs a service-account JWT per request, exchanges it for a bearer token,
/// and reads the configured range. Tokens are short-lived and requests are
/// rare (the cache absorbs page views), so no token caching is done.
pub struct SheetsClient {
    http: reqwest::Client,
    client_email: String,
    private_key: String,
    sheet_id: String,
    range: String,
}

impl SheetsClient {
    /// Build a client from process configuration
    ///
    /// # Errors
    /// * Returns [`FetchError::Http`] if the underlying HTTP client cannot
    ///   be constructed
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(SheetsClient {
            http,
            client_email: config.client_email.clone(),
            private_key: config.private_key.clone(),
            sheet_id: config.sheet_id.clone(),
            range: config.range.clone(),
        })
    }

    // Service-account flow: sign an RS256 JWT with the configured key, then
    // trade it for a one-hour bearer token.
    async fn access_token(&self) -> Result<String, FetchError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let claims = Claims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: TOKEN_URL,
            exp: now + 3600,
            iat: now,
        };

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| FetchError::Auth(format!("invalid service-account key: {e}")))?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| FetchError::Auth(format!("failed to sign token request: {e}")))?;

        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl RowSource for SheetsClient {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, FetchError> {
        let token = self.access_token().await?;
        let url = format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}",
            self.sheet_id,
            urlencoding::encode(&self.range)
        );

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            // Quota errors arrive here as a 429 whose body carries the
            // "Quota exceeded" signature the retry loop matches on.
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Upstream(format!("HTTP {status}: {body}")));
        }

        let range: ValueRange = response.json().await?;
        Ok(range.values)
    }
}
