//! cloudinv - cloud inventory collector
//!
//! Enumerates the scopes of a cloud account (GCP regions, Azure
//! subscriptions), lists one resource kind per scope under a concurrency
//! ceiling and returns a scope-keyed [`engine::Collection`].

pub mod azure;
pub mod config;
pub mod engine;
pub mod error;
pub mod gcp;
pub mod http;
pub mod inventory;
pub mod resource;

/// Version injected at compile time via CLOUDINV_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CLOUDINV_VERSION") {
    Some(v) => v,
    None => "dev",
};
