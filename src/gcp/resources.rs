//! GCP resource fetchers
//!
//! One data-driven fetcher serves every GCP kind in the registry. Regional
//! kinds are a single paginated listing per region; zonal kinds (path with
//! `{zone}`) are listed zone by zone and concatenated in zone order.
//! Project-wide kinds (networks, DNS zones, CDN backends) are listed once,
//! under the [`GLOBAL_SCOPE`] key. Project-wide listings of regional things
//! (Cloud SQL) are narrowed to the scope's region by `region_field`.

use super::regions::{Region, RegionClient};
use super::GCP_BACKOFF_CAP;
use crate::engine::{
    self, paginate, BackoffConfig, Collection, FetchResult, Fetcher, Mode, Retrier, Scope,
};
use crate::error::CollectError;
use crate::resource::{extract_json_value, get_resource, Provider, ResourceDef};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Scope key of project-wide kinds
pub const GLOBAL_SCOPE: &str = "global";

/// Lists one registry kind inside a region
pub struct GcpListFetcher {
    def: &'static ResourceDef,
    backoff: BackoffConfig,
}

impl GcpListFetcher {
    pub fn new(def: &'static ResourceDef, backoff: BackoffConfig) -> Self {
        Self { def, backoff }
    }

    /// Fetcher for a registry key, with the default GCP backoff
    pub fn for_kind(kind: &str) -> Option<Self> {
        get_resource(Provider::Gcp, kind)
            .map(|def| Self::new(def, BackoffConfig::with_cap(GCP_BACKOFF_CAP)))
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    async fn list(
        &self,
        scope: &RegionClient,
        retrier: &mut Retrier,
        path: &str,
    ) -> FetchResult<Value> {
        let url = scope.client.api_url(self.def.api, path);
        let response_path = self.def.response_path.as_str();

        let listed = paginate(retrier, |cursor| {
            let url = url.clone();
            async move {
                scope
                    .client
                    .list_page(&url, cursor.as_deref(), response_path)
                    .await
            }
        })
        .await;

        match listed {
            Ok(items) => Ok(self.keep(&scope.region, items)),
            Err(mut partial) => {
                partial.items = self.keep(&scope.region, partial.items);
                Err(partial)
            }
        }
    }

    /// Apply the kind's record filters
    fn keep(&self, region: &Region, items: Vec<Value>) -> Vec<Value> {
        items
            .into_iter()
            .filter(|item| match &self.def.region_field {
                Some(field) => extract_json_value(item, field).as_deref() == Some(&region.name),
                None => true,
            })
            .filter(|item| match &self.def.flag_field {
                Some(field) => item.get(field).and_then(Value::as_bool).unwrap_or(false),
                None => true,
            })
            .collect()
    }
}

#[async_trait]
impl Fetcher<RegionClient> for GcpListFetcher {
    type Record = Value;

    async fn fetch(&self, scope: &RegionClient) -> FetchResult<Value> {
        let mut retrier = Retrier::new(self.backoff);
        let regional = self.def.path.replace("{region}", &scope.region.name);

        if !self.def.is_zonal() {
            return self.list(scope, &mut retrier, &regional).await;
        }

        let mut items = Vec::new();
        for zone in &scope.region.zones {
            let path = regional.replace("{zone}", zone);
            match self.list(scope, &mut retrier, &path).await {
                Ok(zone_items) => items.extend(zone_items),
                Err(partial) => return Err(partial.after(items)),
            }
        }

        tracing::debug!(
            "{}: {} {} across {} zones",
            scope.region.name,
            items.len(),
            self.def.display_name,
            scope.region.zones.len()
        );
        Ok(items)
    }
}

/// Collapse region scopes into the single scope a project-wide kind is listed under
fn global_scope(scopes: Vec<Scope<RegionClient>>) -> Vec<Scope<RegionClient>> {
    scopes
        .into_iter()
        .take(1)
        .map(|scope| {
            let region = Region {
                name: GLOBAL_SCOPE.to_string(),
                status: "UP".to_string(),
                zones: Vec::new(),
            };
            Scope::new(
                GLOBAL_SCOPE,
                RegionClient {
                    client: scope.client.client,
                    region,
                },
            )
        })
        .collect()
}

/// Collect one GCP resource kind across region scopes
pub async fn collect_kind(
    kind: &str,
    scopes: Vec<Scope<RegionClient>>,
    limit: i64,
    mode: Mode,
    backoff: BackoffConfig,
) -> Result<Collection<Value>, CollectError> {
    let fetcher = GcpListFetcher::for_kind(kind)
        .ok_or_else(|| CollectError::UnknownKind(kind.to_string()))?
        .with_backoff(backoff);

    let scopes = if fetcher.def.global {
        global_scope(scopes)
    } else {
        scopes
    };

    engine::collect(scopes, Arc::new(fetcher), limit, mode).await
}
