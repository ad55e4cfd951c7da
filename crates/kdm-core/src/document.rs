//! The channel manifest as an editable document graph
//!
//! [`DocumentGraph`] owns the loaded tree together with the set of declared
//! reference names and the rename table that maps collision-safe names of
//! newly added tables to their display form.

use std::collections::{BTreeMap, BTreeSet};

use crate::emitter::{self, Emitted};
use crate::error::{CoreError, Result};
use crate::node::{Node, NodeKind};
use crate::parser;
use crate::release::{ReleaseEntry, VERSION};
use crate::serializer;

/// Top-level key holding the release sequence
pub const RELEASES_KEY: &str = "releases";

#[derive(Debug, Clone)]
pub struct DocumentGraph {
    preamble: Vec<String>,
    root: Node,
    trailing: Vec<String>,
    anchors: BTreeSet<String>,
    /// Collision-safe name -> display name
    renames: BTreeMap<String, String>,
}

impl DocumentGraph {
    /// Load a manifest.
    ///
    /// The root must be a mapping whose `releases` value is a non-empty
    /// sequence of mappings, each carrying a `version`. Every alias must
    /// refer to an anchor declared before it.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| CoreError::parse(0, format!("manifest is not valid UTF-8: {}", e)))?;
        let parsed = parser::parse(text)?;

        if !parsed.root.is_mapping() {
            return Err(CoreError::parse(0, "top level must be a mapping"));
        }
        let releases = parsed
            .root
            .get(RELEASES_KEY)
            .ok_or_else(|| CoreError::parse(0, format!("missing '{}' key", RELEASES_KEY)))?;
        if !releases.is_sequence() {
            return Err(CoreError::parse(
                0,
                format!("'{}' must be a sequence", RELEASES_KEY),
            ));
        }
        if releases.items().is_empty() {
            return Err(CoreError::parse(
                0,
                format!("'{}' is empty, there is no release to build on", RELEASES_KEY),
            ));
        }
        for (index, release) in releases.items().iter().enumerate() {
            if release.get(VERSION).and_then(Node::as_str).is_none() {
                return Err(CoreError::parse(
                    0,
                    format!("release #{} has no '{}'", index + 1, VERSION),
                ));
            }
        }

        tracing::debug!(
            "loaded manifest with {} releases and {} anchors",
            releases.items().len(),
            parsed.anchors.len()
        );

        Ok(Self {
            preamble: parsed.preamble,
            root: parsed.root,
            trailing: parsed.trailing,
            anchors: parsed.anchors.into_iter().collect(),
            renames: BTreeMap::new(),
        })
    }

    /// Release nodes in document order
    pub fn releases(&self) -> &[Node] {
        self.root
            .get(RELEASES_KEY)
            .map(Node::items)
            .unwrap_or_default()
    }

    fn releases_mut(&mut self) -> Option<&mut Vec<Node>> {
        let NodeKind::Mapping(entries) = &mut self.root.kind else {
            return None;
        };
        let entry = entries
            .iter_mut()
            .find(|entry| entry.key.as_str() == Some(RELEASES_KEY))?;
        match &mut entry.value.kind {
            NodeKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Release versions in document order, oldest first
    pub fn versions(&self) -> Vec<&str> {
        self.releases()
            .iter()
            .filter_map(|release| release.get(VERSION).and_then(Node::as_str))
            .collect()
    }

    pub fn contains_version(&self, version: &str) -> bool {
        self.versions().contains(&version)
    }

    /// Index and logical view of the release carrying `version`
    pub fn find_release_position(&self, version: &str) -> Result<(usize, ReleaseEntry)> {
        let index = self
            .versions()
            .iter()
            .position(|v| *v == version)
            .ok_or_else(|| CoreError::ReleaseNotFound {
                version: version.to_string(),
            })?;
        let entry = ReleaseEntry::from_node(&self.releases()[index])?;
        Ok((index, entry))
    }

    pub fn has_anchor(&self, name: &str) -> bool {
        self.anchors.contains(name)
    }

    /// Declared reference names, sorted
    pub fn anchors(&self) -> impl Iterator<Item = &str> {
        self.anchors.iter().map(String::as_str)
    }

    pub fn renames(&self) -> &BTreeMap<String, String> {
        &self.renames
    }

    /// Reserve a reference name for the `group` table of `version`.
    ///
    /// Returns the collision-safe name to build with: the group followed by
    /// the alphanumeric characters of the version, with a counter appended
    /// if that is taken. The display name `<group>-<version with '.' and
    /// '+' as '-'>` replaces it on encoding and must itself be unused.
    pub fn allocate_name(&mut self, group: &str, version: &str) -> Result<String> {
        let display_as = display_name(group, version);
        if self.is_name_taken(&display_as) {
            return Err(CoreError::DuplicateAnchor { name: display_as });
        }

        let base: String = group
            .chars()
            .chain(version.chars())
            .filter(char::is_ascii_alphanumeric)
            .collect();
        let mut internal = base.clone();
        let mut counter = 1;
        while self.is_name_taken(&internal) {
            counter += 1;
            internal = format!("{}x{}", base, counter);
        }

        tracing::debug!("allocated reference name {} for {}", internal, display_as);
        self.renames.insert(internal.clone(), display_as);
        Ok(internal)
    }

    fn is_name_taken(&self, name: &str) -> bool {
        self.anchors.contains(name)
            || self.renames.contains_key(name)
            || self.renames.values().any(|display| display == name)
    }

    /// Insert `entry` right after the release at `index`.
    ///
    /// The entry's version must be new, the names it declares must be unused
    /// and every name it references must already be declared. Returns the
    /// index of the inserted release.
    pub fn insert_release_after(&mut self, index: usize, entry: &ReleaseEntry) -> Result<usize> {
        if self.contains_version(&entry.version) {
            return Err(CoreError::DuplicateRelease {
                version: entry.version.clone(),
            });
        }
        let count = self.releases().len();
        if index >= count {
            return Err(CoreError::InvalidRelease {
                version: entry.version.clone(),
                message: format!(
                    "insert position {} is past the last release ({})",
                    index, count
                ),
            });
        }

        let node = entry.to_node();

        let mut declared = Vec::new();
        node.for_each_anchor(&mut |name| declared.push(name.to_string()));
        let mut seen = BTreeSet::new();
        for name in &declared {
            if self.anchors.contains(name) || !seen.insert(name.as_str()) {
                return Err(CoreError::DuplicateAnchor { name: name.clone() });
            }
        }

        let mut referenced = Vec::new();
        node.for_each_alias(&mut |name| referenced.push(name.to_string()));
        if let Some(missing) = referenced.iter().find(|name| !self.anchors.contains(*name)) {
            return Err(CoreError::InvalidRelease {
                version: entry.version.clone(),
                message: format!("references undeclared name '{}'", missing),
            });
        }

        let position = index + 1;
        let releases = self.releases_mut().ok_or_else(|| {
            CoreError::parse(0, format!("'{}' must be a sequence", RELEASES_KEY))
        })?;
        releases.insert(position, node);
        self.anchors.extend(declared);

        tracing::info!("inserted {} at position {}", entry.version, position);
        Ok(position)
    }

    /// Serialize the document to manifest text
    pub fn encode(&self) -> Result<Vec<u8>> {
        serializer::encode(self)
    }

    pub(crate) fn emit(&self) -> Emitted {
        emitter::emit(&self.preamble, &self.root, &self.trailing)
    }
}

/// Human-readable reference name of a table, e.g. `charts-v1-33-2-rke2r1`
pub fn display_name(group: &str, version: &str) -> String {
    format!("{}-{}", group, version.replace(['.', '+'], "-"))
}
