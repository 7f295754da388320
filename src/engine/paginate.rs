//! Cursor pagination
//!
//! [`paginate`] drives a list call from an empty cursor until the provider
//! stops returning one, concatenating pages in arrival order. Every page
//! request goes through the caller's [`Retrier`], so a throttled page is
//! retried with the same cursor and pagination resumes where it left off.

use super::backoff::Retrier;
use crate::error::ApiError;
use std::future::Future;

/// One page of a list response
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token; `None` on the last page
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// Build a page, treating an empty cursor as the end of the listing
    pub fn new(items: Vec<T>, next: Option<String>) -> Self {
        Self {
            items,
            next: next.filter(|cursor| !cursor.is_empty()),
        }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Items gathered before a fetch hit a fatal error
#[derive(Debug)]
pub struct Partial<R> {
    pub items: Vec<R>,
    pub error: ApiError,
}

impl<R> Partial<R> {
    /// Prepend items gathered by earlier listings of the same fetch
    pub fn after(mut self, mut earlier: Vec<R>) -> Self {
        earlier.append(&mut self.items);
        self.items = earlier;
        self
    }

    pub fn into_error(self) -> ApiError {
        self.error
    }
}

/// Outcome of fetching one scope: every record, or what we had plus the error
pub type FetchResult<R> = Result<Vec<R>, Partial<R>>;

/// Fetch every page of a listing
///
/// `list` receives the cursor for the page to fetch (`None` for the first).
pub async fn paginate<T, F, Fut>(retrier: &mut Retrier, mut list: F) -> FetchResult<T>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ApiError>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = match retrier.call(|| list(cursor.clone())).await {
            Ok(page) => page,
            Err(error) => {
                tracing::debug!(
                    "Pagination stopped after {} pages ({} items): {}",
                    pages,
                    items.len(),
                    error
                );
                return Err(Partial { items, error });
            }
        };

        pages += 1;
        items.extend(page.items);

        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    tracing::debug!("Fetched {} items in {} pages", items.len(), pages);
    Ok(items)
}
