//! Bounded concurrent collection engine
//!
//! One generic engine collects any resource kind from any provider:
//!
//! - a [`ScopeSource`] enumerates the scopes to query (regions, subscriptions),
//!   each with a client bound to it
//! - a [`Fetcher`] lists every record of one kind inside one scope, paginating
//!   through [`paginate`] and retrying throttled calls through [`Retrier`]
//! - [`collect`] runs the fetcher over all scopes under a concurrency ceiling
//!   and folds the results with an [`Aggregator`]
//!
//! # Module Structure
//!
//! - [`backoff`] - retry wrapper with capped exponential backoff
//! - [`paginate`] - cursor pagination loop
//! - [`aggregate`] - scope-keyed result map
//! - [`orchestrator`] - batch-then-serial fan-out

pub mod aggregate;
pub mod backoff;
pub mod orchestrator;
pub mod paginate;

use async_trait::async_trait;

pub use aggregate::{merge, Aggregator, Collection, Mode, ScopeEntry};
pub use backoff::{Backoff, BackoffConfig, Retrier};
pub use orchestrator::{batch_size, collect};
pub use paginate::{paginate, FetchResult, Page, Partial};

/// An administrative boundary queried on its own, with its bound client
#[derive(Debug, Clone)]
pub struct Scope<C> {
    pub id: String,
    pub client: C,
}

impl<C> Scope<C> {
    pub fn new(id: impl Into<String>, client: C) -> Self {
        Self {
            id: id.into(),
            client,
        }
    }
}

/// Supplies the ordered set of scopes for a run
#[async_trait]
pub trait ScopeSource: Send + Sync {
    type Client: Send + Sync + 'static;

    /// Fails as a whole when no scope can be built; the run never starts then
    async fn enumerate(&self) -> anyhow::Result<Vec<Scope<Self::Client>>>;
}

/// Lists every record of one resource kind inside one scope
#[async_trait]
pub trait Fetcher<C>: Send + Sync {
    type Record: Send + 'static;

    async fn fetch(&self, client: &C) -> FetchResult<Self::Record>;
}
