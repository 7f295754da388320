//! Resource abstraction layer
//!
//! Resource kinds are data, not code. Definitions are loaded from JSON files
//! at compile time, so a new list-style kind is a JSON entry rather than a new
//! fetcher.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource kind definitions from embedded JSON
//! - [`fetcher`] - Extracts pages and fields from list responses
//!
//! # Resource Definitions
//!
//! Resources are defined in JSON files under `src/resources/`:
//! - `gcp.json` - GCP kinds (instances, Cloud SQL, addressing, VPC, DNS, CDN)
//! - `azure.json` - subscription-scoped Azure kinds (VMs, databases, networking, CDN, DNS)

pub mod fetcher;
mod registry;

pub use fetcher::{extract_items, extract_json_value, extract_short_name, page_from_response};
pub use registry::*;
