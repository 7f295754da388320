//! GCP provider
//!
//! Region-scoped collection against the Compute Engine REST API.
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication using Application Default Credentials
//! - [`client`] - GCP client for making API requests
//! - [`regions`] - Region listing, the scope source for GCP runs
//! - [`resources`] - Data-driven fetcher for every GCP kind in the registry
//!
//! # Example
//!
//! ```ignore
//! use cloudinv::engine::{BackoffConfig, Mode, ScopeSource};
//! use cloudinv::gcp::{client::GcpClient, regions::RegionSource, resources::collect_kind};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new("my-project").await?;
//!     let scopes = RegionSource::new(client).enumerate().await?;
//!     let backoff = BackoffConfig::default();
//!     let instances = collect_kind("instances", scopes, 4, Mode::Records, backoff).await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

pub mod auth;
pub mod client;
pub mod regions;
pub mod resources;

/// Longest backoff delay between throttled Compute Engine calls
pub const GCP_BACKOFF_CAP: Duration = Duration::from_secs(1);
