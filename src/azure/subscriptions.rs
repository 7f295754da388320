//! Azure Subscriptions
//!
//! Subscriptions are the collection scopes for Azure. Discovered
//! subscriptions are keyed by display name, with the ID appended when two
//! share a name; user-supplied IDs get a synthetic `SubscriptionID {n} : {id}`
//! key.

use super::client::{AzureClient, SubscriptionClient, SUBSCRIPTIONS_API_VERSION};
use super::AZURE_BACKOFF_CAP;
use crate::config::dedup_names;
use crate::engine::{paginate, BackoffConfig, Retrier, Scope, ScopeSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Subscription information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub subscription_id: String,
    pub display_name: String,
    pub state: String,
}

impl From<&Value> for Subscription {
    fn from(value: &Value) -> Self {
        let field = |name: &str, default: &str| {
            value
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or(default)
                .to_string()
        };

        Self {
            subscription_id: field("subscriptionId", "-"),
            display_name: field("displayName", "-"),
            state: field("state", "Unknown"),
        }
    }
}

/// List every subscription the principal can see
pub async fn list_subscriptions(client: &AzureClient) -> Result<Vec<Subscription>> {
    let url = client.url("/subscriptions");
    let mut retrier = Retrier::new(BackoffConfig::with_cap(AZURE_BACKOFF_CAP));

    let items = paginate(&mut retrier, |next| {
        let url = url.clone();
        async move {
            client
                .list_page(&url, SUBSCRIPTIONS_API_VERSION, next.as_deref(), "value")
                .await
        }
    })
    .await
    .map_err(|partial| partial.into_error())
    .context("Failed to list Azure subscriptions")?;

    Ok(items.iter().map(Subscription::from).collect())
}

/// Key used for a user-supplied subscription ID
pub fn user_defined_key(index: usize, subscription_id: &str) -> String {
    format!("SubscriptionID {} : {}", index, subscription_id)
}

/// Keys for discovered subscriptions, in input order
///
/// A display name shared by several subscriptions becomes `{name} ({id})`
/// for each of them so no scope shadows another in the output.
pub fn discovered_keys(subscriptions: &[Subscription]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for sub in subscriptions {
        *counts.entry(sub.display_name.as_str()).or_default() += 1;
    }

    subscriptions
        .iter()
        .map(|sub| match counts.get(sub.display_name.as_str()) {
            Some(&n) if n > 1 => format!("{} ({})", sub.display_name, sub.subscription_id),
            _ => sub.display_name.clone(),
        })
        .collect()
}

/// Subscription scope source
pub struct SubscriptionSource {
    client: AzureClient,
    only: Option<Vec<String>>,
}

impl SubscriptionSource {
    /// Discover subscriptions through the API
    pub fn new(client: AzureClient) -> Self {
        Self { client, only: None }
    }

    /// Use these subscription IDs as-is, without discovery; repeats are listed once
    pub fn with_ids(client: AzureClient, ids: Vec<String>) -> Self {
        Self {
            client,
            only: Some(dedup_names(ids)),
        }
    }
}

#[async_trait]
impl ScopeSource for SubscriptionSource {
    type Client = SubscriptionClient;

    async fn enumerate(&self) -> Result<Vec<Scope<SubscriptionClient>>> {
        let scopes: Vec<_> = match &self.only {
            Some(ids) => ids
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    Scope::new(user_defined_key(i, id), self.client.for_subscription(id))
                })
                .collect(),
            None => {
                let subscriptions = list_subscriptions(&self.client).await?;
                discovered_keys(&subscriptions)
                    .into_iter()
                    .zip(&subscriptions)
                    .map(|(key, sub)| {
                        Scope::new(key, self.client.for_subscription(&sub.subscription_id))
                    })
                    .collect()
            }
        };

        if scopes.is_empty() {
            anyhow::bail!("No Azure subscriptions available");
        }

        tracing::info!("Enumerated {} Azure subscriptions", scopes.len());
        Ok(scopes)
    }
}
