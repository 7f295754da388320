//! Result aggregation
//!
//! Folds per-scope fetch results into a [`Collection`]: a scope-keyed map of
//! either the records themselves or only their count. Scopes that returned no
//! records are dropped, they never show up as a key.

use serde::Serialize;
use std::collections::BTreeMap;

/// What a collection run keeps for each scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Keep every record
    #[default]
    Records,
    /// Keep only the number of records (statistics mode)
    Counts,
}

/// Data recorded for one scope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScopeEntry<R> {
    Records(Vec<R>),
    Count(usize),
}

impl<R> ScopeEntry<R> {
    /// Number of records this entry stands for
    pub fn len(&self) -> usize {
        match self {
            ScopeEntry::Records(records) => records.len(),
            ScopeEntry::Count(count) => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> Option<&[R]> {
        match self {
            ScopeEntry::Records(records) => Some(records),
            ScopeEntry::Count(_) => None,
        }
    }
}

/// Scope-keyed result of a collection run
///
/// Serializes as a plain JSON object: scope id to record array or count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Collection<R> {
    entries: BTreeMap<String, ScopeEntry<R>>,
}

impl<R> Default for Collection<R> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<R> Collection<R> {
    /// Number of scopes with at least one record
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, scope: &str) -> Option<&ScopeEntry<R>> {
        self.entries.get(scope)
    }

    pub fn contains_scope(&self, scope: &str) -> bool {
        self.entries.contains_key(scope)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScopeEntry<R>)> {
        self.entries.iter().map(|(scope, entry)| (scope.as_str(), entry))
    }

    /// Record count per scope, whatever the mode
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.entries
            .iter()
            .map(|(scope, entry)| (scope.clone(), entry.len()))
            .collect()
    }

    /// Records across all scopes
    pub fn total(&self) -> usize {
        self.entries.values().map(ScopeEntry::len).sum()
    }
}

/// Accumulates per-scope results for one run
#[derive(Debug)]
pub struct Aggregator<R> {
    mode: Mode,
    entries: BTreeMap<String, ScopeEntry<R>>,
}

impl<R> Aggregator<R> {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            entries: BTreeMap::new(),
        }
    }

    /// Record a scope's items; returns `false` when the scope was dropped as empty
    pub fn merge(&mut self, scope: impl Into<String>, items: Vec<R>) -> bool {
        if items.is_empty() {
            return false;
        }

        let entry = match self.mode {
            Mode::Records => ScopeEntry::Records(items),
            Mode::Counts => ScopeEntry::Count(items.len()),
        };
        self.entries.insert(scope.into(), entry);
        true
    }

    pub fn finish(self) -> Collection<R> {
        Collection {
            entries: self.entries,
        }
    }
}

/// Merge a batch of per-scope results in one go
pub fn merge<R, I, S>(mode: Mode, batch: I) -> Collection<R>
where
    I: IntoIterator<Item = (S, Vec<R>)>,
    S: Into<String>,
{
    let mut aggregator = Aggregator::new(mode);
    for (scope, items) in batch {
        aggregator.merge(scope, items);
    }
    aggregator.finish()
}
