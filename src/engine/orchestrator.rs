//! Bounded fan-out over scopes
//!
//! A run is one batch of concurrency followed by a serial tail:
//!
//! 1. The first `K'` scopes (in enumeration order) are each fetched on their
//!    own task, where `K' = min(K, scopes)` for `K > 0` and `K' = scopes`
//!    otherwise.
//! 2. The orchestrator waits for the whole batch. If any task failed the run
//!    stops there with that error, else all non-empty results are merged.
//! 3. Every remaining scope is fetched directly, one at a time, in order. The
//!    first failure stops the run; scopes after it are never attempted.
//!
//! Peak concurrency is therefore `K'`, and scopes beyond the batch never
//! overlap. Tasks hand their result back through their join handle; only the
//! orchestrator writes to the aggregator. Dropping a run before it finishes
//! (a caller timeout) aborts the batch tasks it spawned.

use super::aggregate::{Aggregator, Collection, Mode};
use super::{Fetcher, Scope};
use crate::error::CollectError;
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A spawned batch fetch; aborted when dropped, so a cancelled run leaves nothing behind
struct BatchTask<R> {
    scope: String,
    handle: JoinHandle<R>,
}

impl<R> Drop for BatchTask<R> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Number of scopes fetched in the concurrent batch
///
/// `limit <= 0` or `limit >= total` means unbounded: every scope is batched.
pub fn batch_size(limit: i64, total: usize) -> usize {
    match usize::try_from(limit) {
        Ok(limit) if limit > 0 && limit < total => limit,
        _ => total,
    }
}

/// Collect one resource kind across all scopes
pub async fn collect<C, F>(
    scopes: Vec<Scope<C>>,
    fetcher: Arc<F>,
    limit: i64,
    mode: Mode,
) -> Result<Collection<F::Record>, CollectError>
where
    C: Send + Sync + 'static,
    F: Fetcher<C> + ?Sized + 'static,
{
    let total = scopes.len();
    let batch = batch_size(limit, total);
    let mut aggregator = Aggregator::new(mode);
    let mut scopes = scopes.into_iter();

    tracing::info!(
        "Collecting across {} scopes: {} concurrent, {} sequential",
        total,
        batch,
        total - batch
    );

    let mut tasks: Vec<_> = scopes
        .by_ref()
        .take(batch)
        .map(|scope| {
            let fetcher = Arc::clone(&fetcher);
            tracing::debug!("Dispatching {}", scope.id);
            BatchTask {
                scope: scope.id.clone(),
                handle: tokio::spawn(async move { fetcher.fetch(&scope.client).await }),
            }
        })
        .collect();

    let outcomes = join_all(tasks.iter_mut().map(|task| &mut task.handle)).await;
    let ids = tasks.iter().map(|task| task.scope.clone());

    let mut fetched = Vec::with_capacity(outcomes.len());
    for (id, outcome) in ids.zip(outcomes) {
        match outcome {
            Ok(Ok(items)) => fetched.push((id, items)),
            Ok(Err(partial)) => {
                tracing::error!(
                    "Fetch failed for {} after {} items: {}",
                    id,
                    partial.items.len(),
                    partial.error
                );
                return Err(CollectError::Scope {
                    scope: id,
                    source: partial.error,
                });
            }
            Err(join_err) => {
                tracing::error!("Task for {} did not complete: {}", id, join_err);
                return Err(CollectError::Task {
                    scope: id,
                    message: join_err.to_string(),
                });
            }
        }
    }

    for (id, items) in fetched {
        if !aggregator.merge(id.as_str(), items) {
            tracing::debug!("{} returned no records", id);
        }
    }

    for scope in scopes {
        tracing::debug!("Fetching {} sequentially", scope.id);
        match fetcher.fetch(&scope.client).await {
            Ok(items) => {
                if !aggregator.merge(scope.id.as_str(), items) {
                    tracing::debug!("{} returned no records", scope.id);
                }
            }
            Err(partial) => {
                tracing::error!(
                    "Fetch failed for {} after {} items: {}",
                    scope.id,
                    partial.items.len(),
                    partial.error
                );
                return Err(CollectError::Scope {
                    scope: scope.id,
                    source: partial.error,
                });
            }
        }
    }

    let collection = aggregator.finish();
    tracing::info!(
        "Collected {} records across {} scopes",
        collection.total(),
        collection.len()
    );
    Ok(collection)
}
