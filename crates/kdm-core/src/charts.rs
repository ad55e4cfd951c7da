//! Bundled chart sets and the diff between two releases
//!
//! A release bundles a set of Helm charts. When a release is added, only the
//! charts that are new or whose version moved need to be pinned on the new
//! entry; everything else is inherited from the predecessor.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BoxError, CoreError, Result};

/// One chart pinned by a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRecord {
    /// Chart repository label
    pub repo: String,
    pub version: String,
}

impl ChartRecord {
    pub fn new(repo: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            version: version.into(),
        }
    }
}

/// Charts keyed by name, ordered by name
pub type ChartSet = BTreeMap<String, ChartRecord>;

/// Where the chart set of a release ref comes from
#[async_trait]
pub trait ChartSource: Send + Sync {
    /// Fetch the charts bundled by `release_ref` (a release version)
    async fn fetch_chart_set(&self, release_ref: &str) -> std::result::Result<ChartSet, BoxError>;
}

#[async_trait]
impl<T: ChartSource + ?Sized> ChartSource for &T {
    async fn fetch_chart_set(&self, release_ref: &str) -> std::result::Result<ChartSet, BoxError> {
        (**self).fetch_chart_set(release_ref).await
    }
}

#[async_trait]
impl<T: ChartSource + ?Sized> ChartSource for Box<T> {
    async fn fetch_chart_set(&self, release_ref: &str) -> std::result::Result<ChartSet, BoxError> {
        (**self).fetch_chart_set(release_ref).await
    }
}

/// Charts in `new` that are absent from `old` or pinned at another version.
///
/// Charts present only in `old` are not reported. A changed repo label with
/// an unchanged version is not a change.
pub fn diff_chart_sets(new: &ChartSet, old: &ChartSet) -> ChartSet {
    new.iter()
        .filter(|(name, record)| {
            old.get(*name)
                .is_none_or(|previous| previous.version != record.version)
        })
        .map(|(name, record)| (name.clone(), record.clone()))
        .collect()
}

/// Fetch both chart sets and diff them
pub async fn diff<S: ChartSource + ?Sized>(
    source: &S,
    new_ref: &str,
    prev_ref: &str,
) -> Result<ChartSet> {
    let new = fetch(source, new_ref).await?;
    let old = fetch(source, prev_ref).await?;
    let changed = diff_chart_sets(&new, &old);

    tracing::debug!(
        "{} of {} charts changed between {} and {}",
        changed.len(),
        new.len(),
        prev_ref,
        new_ref
    );
    Ok(changed)
}

async fn fetch<S: ChartSource + ?Sized>(source: &S, release_ref: &str) -> Result<ChartSet> {
    source
        .fetch_chart_set(release_ref)
        .await
        .map_err(|source| CoreError::ChartFetch {
            reference: release_ref.to_string(),
            source,
        })
}

/// In-memory chart source
///
/// Serves chart sets registered up front and records every ref it was asked
/// for. Unknown refs fail.
#[derive(Debug, Default)]
pub struct StaticChartSource {
    sets: BTreeMap<String, ChartSet>,
    requests: Mutex<Vec<String>>,
}

impl StaticChartSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release<I, N>(mut self, release_ref: impl Into<String>, charts: I) -> Self
    where
        I: IntoIterator<Item = (N, ChartRecord)>,
        N: Into<String>,
    {
        self.insert(release_ref, charts);
        self
    }

    pub fn insert<I, N>(&mut self, release_ref: impl Into<String>, charts: I)
    where
        I: IntoIterator<Item = (N, ChartRecord)>,
        N: Into<String>,
    {
        let set = charts
            .into_iter()
            .map(|(name, record)| (name.into(), record))
            .collect();
        self.sets.insert(release_ref.into(), set);
    }

    /// Refs requested so far, in request order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChartSource for StaticChartSource {
    async fn fetch_chart_set(&self, release_ref: &str) -> std::result::Result<ChartSet, BoxError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(release_ref.to_string());
        }
        self.sets
            .get(release_ref)
            .cloned()
            .ok_or_else(|| format!("no chart list published for {}", release_ref).into())
    }
}
