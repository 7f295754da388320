//! Resource Registry - Load resource kind definitions from JSON
//!
//! Every collectable resource kind is described in an embedded JSON file per
//! provider: where to list it, how to page through it and whether it is part
//! of the default dump.

use clap::ValueEnum;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/gcp.json"),
    include_str!("../resources/azure.json"),
];

/// Cloud provider a resource kind belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gcp,
    Azure,
}

impl Provider {
    /// What one scope is for this provider
    pub fn scope_noun(self) -> &'static str {
        match self {
            Provider::Gcp => "regions",
            Provider::Azure => "subscriptions",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gcp => write!(f, "gcp"),
            Provider::Azure => write!(f, "azure"),
        }
    }
}

/// GCP API a kind is listed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GcpApi {
    #[default]
    Compute,
    Sqladmin,
    Dns,
}

impl GcpApi {
    /// Public endpoint host
    pub fn host(self) -> &'static str {
        match self {
            GcpApi::Compute => "compute.googleapis.com",
            GcpApi::Sqladmin => "sqladmin.googleapis.com",
            GcpApi::Dns => "dns.googleapis.com",
        }
    }

    /// Path prefix in front of `projects/{project}`
    pub fn prefix(self) -> &'static str {
        match self {
            GcpApi::Compute => "compute/v1",
            GcpApi::Sqladmin => "v1",
            GcpApi::Dns => "dns/v1",
        }
    }
}

/// Resource kind definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    pub display_name: String,
    pub provider: Provider,
    /// List path relative to the scope; `{region}` and `{zone}` are substituted
    pub path: String,
    #[serde(default)]
    pub api_version: Option<String>,
    /// Nested listing under each parent item (e.g. databases of a server)
    #[serde(default)]
    pub child_path: Option<String>,
    /// Field holding the item array in a list response
    pub response_path: String,
    /// Collected when no filter is given
    #[serde(default)]
    pub default: bool,
    /// Supports the derived Ansible inventory
    #[serde(default)]
    pub inventory: bool,
    /// GCP only: API serving the listing
    #[serde(default)]
    pub api: GcpApi,
    /// GCP only: project-wide kind, listed once under the `global` scope
    #[serde(default)]
    pub global: bool,
    /// Keep only records whose field equals the scope's region
    #[serde(default)]
    pub region_field: Option<String>,
    /// Keep only records whose boolean field is `true`
    #[serde(default)]
    pub flag_field: Option<String>,
}

impl ResourceDef {
    /// Whether the listing fans out over every zone of a region
    pub fn is_zonal(&self) -> bool {
        self.path.contains("{zone}")
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
struct ResourceConfig {
    #[serde(default)]
    resources: HashMap<String, ResourceDef>,
}

type Registry = HashMap<Provider, HashMap<String, ResourceDef>>;

/// Global registry loaded from JSON
static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
fn get_registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let mut registry: Registry = HashMap::new();

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            for (key, def) in partial.resources {
                registry.entry(def.provider).or_default().insert(key, def);
            }
        }

        registry
    })
}

/// Get a resource definition by provider and key
pub fn get_resource(provider: Provider, key: &str) -> Option<&'static ResourceDef> {
    get_registry().get(&provider)?.get(key)
}

/// All resource keys for a provider, sorted
pub fn resource_keys(provider: Provider) -> Vec<&'static str> {
    let mut keys: Vec<_> = get_registry()
        .get(&provider)
        .map(|defs| defs.keys().map(|s| s.as_str()).collect())
        .unwrap_or_default();
    keys.sort_unstable();
    keys
}

/// Keys collected when no filter is given
pub fn default_keys(provider: Provider) -> Vec<&'static str> {
    resource_keys(provider)
        .into_iter()
        .filter(|key| get_resource(provider, key).is_some_and(|def| def.default))
        .collect()
}

/// An empty filter means "the default set"
pub fn validate_filter(provider: Provider, filter: &str) -> bool {
    filter.is_empty() || get_resource(provider, filter).is_some()
}

/// Resolve a filter into the kinds to collect
pub fn selected_keys(provider: Provider, filter: &str) -> Vec<&'static str> {
    if filter.is_empty() {
        return default_keys(provider);
    }
    resource_keys(provider)
        .into_iter()
        .filter(|key| *key == filter)
        .collect()
}
