//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication
//! and HTTP functionality.

use super::auth::GcpCredentials;
use crate::engine::Page;
use crate::error::ApiError;
use crate::http::{AccessToken, HttpClient};
use crate::resource::fetcher::{page_from_response, GCP_CURSOR_FIELD};
use crate::resource::GcpApi;
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    token: Arc<dyn AccessToken>,
    pub http: HttpClient,
    pub project_id: String,
    /// Serves every API instead of its public host when set
    endpoint: Option<String>,
}

impl GcpClient {
    /// Create a new GCP client using Application Default Credentials
    pub async fn new(project_id: &str) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        let http = HttpClient::new().context("Failed to create HTTP client")?;

        Ok(Self {
            token: Arc::new(credentials),
            http,
            project_id: project_id.to_string(),
            endpoint: None,
        })
    }

    /// Create a client from an existing token source, served by one endpoint
    pub fn with_token(
        project_id: &str,
        token: Arc<dyn AccessToken>,
        http: HttpClient,
        endpoint: &str,
    ) -> Self {
        Self {
            token,
            http,
            project_id: project_id.to_string(),
            endpoint: Some(endpoint.trim_end_matches('/').to_string()),
        }
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let token = self.token.token().await?;
        self.http.get(url, &token, query).await
    }

    /// Fetch one page of a list endpoint
    pub async fn list_page(
        &self,
        url: &str,
        page_token: Option<&str>,
        response_path: &str,
    ) -> Result<Page<Value>, ApiError> {
        let query: Vec<(&str, &str)> = page_token
            .map(|token| vec![("pageToken", token)])
            .unwrap_or_default();

        let response = self.get(url, &query).await?;
        Ok(page_from_response(&response, response_path, GCP_CURSOR_FIELD))
    }

    /// Build a project-level URL of one of the GCP APIs
    pub fn api_url(&self, api: GcpApi, path: &str) -> String {
        let root = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}", api.host()),
        };
        format!(
            "{}/{}/projects/{}/{}",
            root,
            api.prefix(),
            self.project_id,
            path
        )
    }

    /// Build Compute Engine API URL
    pub fn compute_url(&self, path: &str) -> String {
        self.api_url(GcpApi::Compute, path)
    }
}
