//! Azure provider
//!
//! Subscription-scoped collection against Azure Resource Manager.
//!
//! # Module Structure
//!
//! - [`auth`] - service principal credentials (client-credentials grant)
//! - [`client`] - ARM client and its per-subscription binding
//! - [`subscriptions`] - subscription listing, the scope source for Azure runs
//! - [`resources`] - data-driven fetcher for every Azure kind in the registry

use std::time::Duration;

pub mod auth;
pub mod client;
pub mod resources;
pub mod subscriptions;

/// Longest backoff delay between throttled ARM calls
pub const AZURE_BACKOFF_CAP: Duration = Duration::from_secs(30);
