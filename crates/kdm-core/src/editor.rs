//! Adding releases to a loaded manifest
//!
//! For each new version the editor resolves its predecessor against the
//! manifest's history, diffs the two chart sets through a [`ChartSource`],
//! and inserts an entry right after the predecessor that inherits every
//! table by reference. Versions are handled one at a time in the order
//! given, so a later version can build on one added earlier in the batch.

use crate::charts::{self, ChartSet, ChartSource};
use crate::document::DocumentGraph;
use crate::error::{CoreError, Result};
use crate::release::{AGENT_ARGS, CHARTS, GroupNames, SERVER_ARGS};
use crate::version::{DEFAULT_PRODUCT, ReleaseVersion};

/// Outcome of adding one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedRelease {
    pub version: String,
    pub predecessor: String,
    /// Index of the new entry in the release sequence
    pub position: usize,
    /// Charts pinned on the new entry
    pub charts: ChartSet,
}

pub struct ManifestEditor<S> {
    graph: DocumentGraph,
    source: S,
    product: String,
}

impl<S: ChartSource> ManifestEditor<S> {
    pub fn new(graph: DocumentGraph, source: S) -> Self {
        Self {
            graph,
            source,
            product: DEFAULT_PRODUCT.to_string(),
        }
    }

    pub fn load(bytes: &[u8], source: S) -> Result<Self> {
        Ok(Self::new(DocumentGraph::load(bytes)?, source))
    }

    /// Product tag expected in version build metadata
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    pub fn graph(&self) -> &DocumentGraph {
        &self.graph
    }

    /// Resolve the predecessor of `version` against the current history
    pub fn predecessor_of(&self, version: &ReleaseVersion) -> Result<ReleaseVersion> {
        version.predecessor(&self.graph.versions())
    }

    pub async fn add_release(&mut self, version: &str) -> Result<AddedRelease> {
        let version = ReleaseVersion::parse(version, &self.product)?;
        self.add_parsed(&version).await
    }

    /// Add `versions` in order.
    ///
    /// Every version is parsed before anything is fetched. On failure the
    /// manifest is left as it was before the call.
    pub async fn add_releases<V: AsRef<str>>(&mut self, versions: &[V]) -> Result<Vec<AddedRelease>> {
        let parsed = versions
            .iter()
            .map(|v| ReleaseVersion::parse(v.as_ref(), &self.product))
            .collect::<Result<Vec<_>>>()?;

        let snapshot = self.graph.clone();
        let mut added = Vec::with_capacity(parsed.len());
        for version in &parsed {
            match self.add_parsed(version).await {
                Ok(release) => added.push(release),
                Err(e) => {
                    self.graph = snapshot;
                    return Err(e);
                }
            }
        }
        Ok(added)
    }

    async fn add_parsed(&mut self, version: &ReleaseVersion) -> Result<AddedRelease> {
        let new_ref = version.to_string();
        if self.graph.contains_version(&new_ref) {
            return Err(CoreError::DuplicateRelease { version: new_ref });
        }

        let predecessor = self.predecessor_of(version)?;
        let prev_ref = predecessor.to_string();
        tracing::debug!("predecessor of {} is {}", new_ref, prev_ref);

        let (index, prev_entry) = self.graph.find_release_position(&prev_ref)?;
        let changed = charts::diff(&self.source, &new_ref, &prev_ref).await?;

        // names are reserved on a copy so a failed insert leaves no trace
        let mut graph = self.graph.clone();
        let names = GroupNames {
            charts: graph.allocate_name(CHARTS, &new_ref)?,
            server_args: graph.allocate_name(SERVER_ARGS, &new_ref)?,
            agent_args: graph.allocate_name(AGENT_ARGS, &new_ref)?,
        };
        let entry = prev_entry.successor(&new_ref, &names, &changed)?;
        let position = graph.insert_release_after(index, &entry)?;
        self.graph = graph;

        tracing::info!(
            "added {} after {} with {} chart changes",
            new_ref,
            prev_ref,
            changed.len()
        );

        Ok(AddedRelease {
            version: new_ref,
            predecessor: prev_ref,
            position,
            charts: changed,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        self.graph.encode()
    }
}

/// Load `manifest`, add `versions` in order and return the encoded result.
///
/// Nothing is returned unless every version was added.
pub async fn update_manifest<S, V>(
    manifest: &[u8],
    versions: &[V],
    product: &str,
    source: S,
) -> Result<Vec<u8>>
where
    S: ChartSource,
    V: AsRef<str>,
{
    let mut editor = ManifestEditor::load(manifest, source)?.with_product(product);
    editor.add_releases(versions).await?;
    editor.encode()
}
