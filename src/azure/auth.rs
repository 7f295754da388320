//! Azure Authentication
//!
//! OAuth2 client-credentials grant against Microsoft Entra ID, configured
//! from the same environment variables the Azure SDKs read.

use crate::error::ApiError;
use crate::http::{AccessToken, HttpClient};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Environment variables required for client-credential authentication
pub const ENV_VARS: [&str; 3] = ["AZURE_TENANT_ID", "AZURE_CLIENT_ID", "AZURE_CLIENT_SECRET"];

/// Public Entra ID authority
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Scope for Azure Resource Manager tokens
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token response carries no `expires_in`
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Service principal credentials with token caching
#[derive(Clone)]
pub struct AzureCredentials {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority: String,
    http: HttpClient,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl AzureCredentials {
    pub fn new(tenant_id: &str, client_id: &str, client_secret: &str, http: HttpClient) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            authority: DEFAULT_AUTHORITY.to_string(),
            http,
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Build credentials from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`
    pub fn from_env(http: HttpClient) -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok(), http)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, http: HttpClient) -> Result<Self> {
        let mut values = Vec::with_capacity(ENV_VARS.len());
        for var in ENV_VARS {
            match lookup(var).filter(|v| !v.is_empty()) {
                Some(value) => values.push(value),
                None => anyhow::bail!("{} is empty", var),
            }
        }

        Ok(Self::new(&values[0], &values[1], &values[2], http))
    }

    /// Point at a different authority (sovereign clouds, tests)
    pub fn with_authority(mut self, authority: &str) -> Self {
        self.authority = authority.trim_end_matches('/').to_string();
        self
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id)
    }

    async fn request_token(&self) -> Result<CachedToken, ApiError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", MANAGEMENT_SCOPE),
        ];

        let response = self
            .http
            .post_form(&self.token_url(), &form)
            .await
            .map_err(|e| ApiError::Auth(e.to_string()))?;

        let token = response
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ApiError::Auth("token response has no access_token".to_string()))?
            .to_string();

        let ttl = response
            .get("expires_in")
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);

        Ok(CachedToken {
            token,
            expires_at: Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER),
        })
    }
}

#[async_trait]
impl AccessToken for AzureCredentials {
    async fn token(&self) -> Result<String, ApiError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached Azure token expired, fetching new token");
            }
        }

        let fresh = self.request_token().await?;
        let token = fresh.token.clone();
        *self.token_cache.write().await = Some(fresh);

        tracing::debug!("New Azure token cached");
        Ok(token)
    }
}
