//! GCP Regions
//!
//! Regions are the collection scopes for GCP. Each region scope carries the
//! client plus the zones that belong to the region, so zonal kinds can fan
//! out without another lookup.

use super::client::GcpClient;
use super::GCP_BACKOFF_CAP;
use crate::config::dedup_names;
use crate::engine::{paginate, BackoffConfig, Retrier, Scope, ScopeSource};
use crate::resource::extract_short_name;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Region information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub status: String,
    pub zones: Vec<String>,
}

impl From<&Value> for Region {
    fn from(value: &Value) -> Self {
        Self {
            name: value
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string(),
            status: value
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("UNKNOWN")
                .to_string(),
            zones: value
                .get("zones")
                .and_then(|v| v.as_array())
                .map(|zones| {
                    zones
                        .iter()
                        .filter_map(|z| z.as_str())
                        .map(extract_short_name)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Client bound to one region
#[derive(Clone)]
pub struct RegionClient {
    pub client: GcpClient,
    pub region: Region,
}

/// List all regions of the project that are up
pub async fn list_regions(client: &GcpClient) -> Result<Vec<Region>> {
    let url = client.compute_url("regions");
    let mut retrier = Retrier::new(BackoffConfig::with_cap(GCP_BACKOFF_CAP));

    let items = paginate(&mut retrier, |cursor| {
        let url = url.clone();
        async move { client.list_page(&url, cursor.as_deref(), "items").await }
    })
    .await
    .map_err(|partial| partial.into_error())
    .context("Failed to list GCP regions")?;

    Ok(items
        .iter()
        .map(Region::from)
        .filter(|r| r.status == "UP")
        .collect())
}

/// Region scope source, optionally restricted to a user-supplied list
pub struct RegionSource {
    client: GcpClient,
    only: Option<Vec<String>>,
}

impl RegionSource {
    pub fn new(client: GcpClient) -> Self {
        Self { client, only: None }
    }

    /// Restrict to these regions, in this order; repeats are listed once
    pub fn with_regions(client: GcpClient, regions: Vec<String>) -> Self {
        Self {
            client,
            only: Some(dedup_names(regions)),
        }
    }
}

#[async_trait]
impl ScopeSource for RegionSource {
    type Client = RegionClient;

    async fn enumerate(&self) -> Result<Vec<Scope<RegionClient>>> {
        let regions = list_regions(&self.client).await?;

        let selected: Vec<Region> = match &self.only {
            None => regions,
            Some(wanted) => {
                let mut selected = Vec::with_capacity(wanted.len());
                for name in wanted {
                    let region = regions
                        .iter()
                        .find(|r| &r.name == name)
                        .with_context(|| format!("Invalid region selected: {}", name))?;
                    selected.push(region.clone());
                }
                selected
            }
        };

        if selected.is_empty() {
            anyhow::bail!("No GCP regions available for project {}", self.client.project_id);
        }

        tracing::info!("Enumerated {} GCP regions", selected.len());

        Ok(selected
            .into_iter()
            .map(|region| {
                Scope::new(
                    region.name.clone(),
                    RegionClient {
                        client: self.client.clone(),
                        region,
                    },
                )
            })
            .collect())
    }
}
