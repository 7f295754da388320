//! Azure Resource Manager client
//!
//! ARM list calls return `{"value": [...], "nextLink": "<absolute url>"}`.
//! The cursor is the `nextLink` URL itself, already carrying its query.

use super::auth::AzureCredentials;
use crate::engine::Page;
use crate::error::ApiError;
use crate::http::{AccessToken, HttpClient};
use crate::resource::fetcher::{page_from_response, AZURE_CURSOR_FIELD};
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;

/// Public Azure Resource Manager endpoint
pub const MANAGEMENT_BASE_URL: &str = "https://management.azure.com";

/// API version for the subscriptions listing
pub const SUBSCRIPTIONS_API_VERSION: &str = "2020-01-01";

/// Azure Resource Manager client, not yet bound to a subscription
#[derive(Clone)]
pub struct AzureClient {
    token: Arc<dyn AccessToken>,
    pub http: HttpClient,
    base_url: String,
}

impl AzureClient {
    /// Create a client authenticated from the environment
    pub fn from_env() -> Result<Self> {
        let http = HttpClient::new().context("Failed to create HTTP client")?;
        let credentials = AzureCredentials::from_env(http.clone())
            .context("Failed to initialize Azure credentials")?;

        Ok(Self::with_token(Arc::new(credentials), http, MANAGEMENT_BASE_URL))
    }

    /// Create a client from an existing token source and endpoint
    pub fn with_token(token: Arc<dyn AccessToken>, http: HttpClient, base_url: &str) -> Self {
        Self {
            token,
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Bind this client to one subscription
    pub fn for_subscription(&self, subscription_id: &str) -> SubscriptionClient {
        SubscriptionClient {
            client: self.clone(),
            subscription_id: subscription_id.to_string(),
        }
    }

    /// Absolute URL for an ARM path (which starts with `/`)
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch one page: the first from `url` + `api-version`, the rest from `nextLink`
    pub async fn list_page(
        &self,
        url: &str,
        api_version: &str,
        next_link: Option<&str>,
        response_path: &str,
    ) -> Result<Page<Value>, ApiError> {
        let token = self.token.token().await?;

        let response = match next_link {
            Some(link) => self.http.get(link, &token, &[]).await?,
            None => {
                self.http
                    .get(url, &token, &[("api-version", api_version)])
                    .await?
            }
        };

        Ok(page_from_response(&response, response_path, AZURE_CURSOR_FIELD))
    }
}

/// Client bound to one subscription
#[derive(Clone)]
pub struct SubscriptionClient {
    pub client: AzureClient,
    pub subscription_id: String,
}

impl SubscriptionClient {
    /// URL of a subscription-level provider path
    pub fn subscription_url(&self, path: &str) -> String {
        self.client
            .url(&format!("/subscriptions/{}/{}", self.subscription_id, path))
    }
}
