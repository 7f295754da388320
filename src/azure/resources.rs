//! Azure resource fetchers
//!
//! Subscription-level kinds are one paginated listing. Kinds with a
//! `child_path` (SQL databases, CDN endpoints) list their parents first and
//! then every parent's children, keeping parent order.

use super::client::SubscriptionClient;
use super::AZURE_BACKOFF_CAP;
use crate::engine::{
    self, paginate, BackoffConfig, Collection, FetchResult, Fetcher, Mode, Partial, Retrier, Scope,
};
use crate::error::CollectError;
use crate::resource::{get_resource, Provider, ResourceDef};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Lists one registry kind inside a subscription
pub struct AzureListFetcher {
    def: &'static ResourceDef,
    backoff: BackoffConfig,
}

impl AzureListFetcher {
    pub fn new(def: &'static ResourceDef, backoff: BackoffConfig) -> Self {
        Self { def, backoff }
    }

    /// Fetcher for a registry key, with the default Azure backoff
    pub fn for_kind(kind: &str) -> Option<Self> {
        get_resource(Provider::Azure, kind)
            .map(|def| Self::new(def, BackoffConfig::with_cap(AZURE_BACKOFF_CAP)))
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    async fn list(
        &self,
        scope: &SubscriptionClient,
        retrier: &mut Retrier,
        url: &str,
    ) -> FetchResult<Value> {
        let api_version = self.def.api_version.as_deref().unwrap_or_default();
        let response_path = self.def.response_path.as_str();

        paginate(retrier, |next| async move {
            scope
                .client
                .list_page(url, api_version, next.as_deref(), response_path)
                .await
        })
        .await
    }
}

#[async_trait]
impl Fetcher<SubscriptionClient> for AzureListFetcher {
    type Record = Value;

    async fn fetch(&self, scope: &SubscriptionClient) -> FetchResult<Value> {
        let mut retrier = Retrier::new(self.backoff);
        let url = scope.subscription_url(&self.def.path);

        let Some(child) = self.def.child_path.as_deref() else {
            return self.list(scope, &mut retrier, &url).await;
        };

        // Parents are not records of this kind
        let parents = match self.list(scope, &mut retrier, &url).await {
            Ok(parents) => parents,
            Err(partial) => {
                return Err(Partial {
                    items: Vec::new(),
                    error: partial.into_error(),
                })
            }
        };

        let mut items = Vec::new();
        for parent in &parents {
            let Some(parent_id) = parent.get("id").and_then(|v| v.as_str()) else {
                tracing::warn!("{}: parent without id skipped", self.def.display_name);
                continue;
            };

            let child_url = scope
                .client
                .url(&format!("{}/{}", parent_id.trim_end_matches('/'), child));
            match self.list(scope, &mut retrier, &child_url).await {
                Ok(children) => items.extend(children),
                Err(partial) => return Err(partial.after(items)),
            }
        }

        tracing::debug!(
            "{}: {} {} under {} parents",
            scope.subscription_id,
            items.len(),
            self.def.display_name,
            parents.len()
        );
        Ok(items)
    }
}

/// Collect one Azure resource kind across subscription scopes
pub async fn collect_kind(
    kind: &str,
    scopes: Vec<Scope<SubscriptionClient>>,
    limit: i64,
    mode: Mode,
    backoff: BackoffConfig,
) -> Result<Collection<Value>, CollectError> {
    let fetcher = AzureListFetcher::for_kind(kind)
        .ok_or_else(|| CollectError::UnknownKind(kind.to_string()))?
        .with_backoff(backoff);

    engine::collect(scopes, Arc::new(fetcher), limit, mode).await
}
