//! Release entries of the channel manifest
//!
//! A [`ReleaseEntry`] is the logical view of one item of the `releases`
//! sequence. Its `charts`, `serverArgs` and `agentArgs` tables are
//! [`ReferenceGroup`]s: named mappings that can inherit another entry's
//! table by reference and layer local overrides on top.

use crate::charts::{ChartRecord, ChartSet};
use crate::error::{CoreError, Result};
use crate::node::Node;

pub const VERSION: &str = "version";
pub const MIN_CHANNEL_SERVER_VERSION: &str = "minChannelServerVersion";
pub const MAX_CHANNEL_SERVER_VERSION: &str = "maxChannelServerVersion";
pub const CHARTS: &str = "charts";
pub const SERVER_ARGS: &str = "serverArgs";
pub const AGENT_ARGS: &str = "agentArgs";
pub const FEATURE_VERSIONS: &str = "featureVersions";

/// A shared, named table plus local overrides
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceGroup {
    /// Reference name this table declares
    pub anchor: Option<String>,
    /// Reference name this table inherits from
    pub inherits: Option<String>,
    /// Key/value pairs taking precedence over inherited ones
    pub overrides: Vec<(Node, Node)>,
}

impl ReferenceGroup {
    /// A table named `anchor` that inherits everything from `target`
    pub fn inheriting(anchor: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            anchor: Some(anchor.into()),
            inherits: Some(target.into()),
            overrides: Vec::new(),
        }
    }

    /// Set `key` to `value`, replacing an override with the same key
    pub fn with_override(mut self, key: Node, value: Node) -> Self {
        let existing = self
            .overrides
            .iter_mut()
            .find(|(k, _)| k.as_str().is_some() && k.as_str() == key.as_str());
        match existing {
            Some(entry) => entry.1 = value,
            None => self.overrides.push((key, value)),
        }
        self
    }

    /// A table named `anchor` with the same content as this one.
    ///
    /// A named table is inherited whole. An unnamed one inherits what this
    /// table inherits and repeats its overrides, since they cannot be
    /// referenced.
    pub fn successor(&self, anchor: &str) -> Option<Self> {
        if let Some(name) = &self.anchor {
            return Some(Self::inheriting(anchor, name.clone()));
        }
        let target = self.inherits.as_ref()?;
        Some(Self {
            anchor: Some(anchor.to_string()),
            inherits: Some(target.clone()),
            overrides: self
                .overrides
                .iter()
                .map(|(key, value)| (key.clone(), value.without_anchors()))
                .collect(),
        })
    }

    pub fn from_node(node: &Node) -> Self {
        if let Some(target) = node.alias_target() {
            return Self {
                anchor: None,
                inherits: Some(target.to_string()),
                overrides: Vec::new(),
            };
        }
        Self {
            anchor: node.anchor.clone(),
            inherits: node.merge_target().map(str::to_string),
            overrides: node
                .entries()
                .iter()
                .filter(|entry| !entry.key.is_merge_key())
                .map(|entry| (entry.key.clone(), entry.value.clone()))
                .collect(),
        }
    }

    pub fn to_node(&self) -> Node {
        if let (None, Some(target), true) =
            (&self.anchor, &self.inherits, self.overrides.is_empty())
        {
            return Node::alias(target.clone());
        }
        let node = match &self.inherits {
            Some(target) => Node::inherit(target.clone(), self.overrides.clone()),
            None => Node::mapping(self.overrides.clone()),
        };
        match &self.anchor {
            Some(anchor) => node.with_anchor(anchor.clone()),
            None => node,
        }
    }
}

/// Reference names for the tables of a new entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNames {
    pub charts: String,
    pub server_args: String,
    pub agent_args: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseEntry {
    pub version: String,
    pub min_channel_server_version: String,
    pub max_channel_server_version: String,
    pub charts: Option<ReferenceGroup>,
    pub server_args: Option<ReferenceGroup>,
    pub agent_args: Option<ReferenceGroup>,
    /// Carried over from the predecessor, usually as a reference
    pub feature_versions: Option<Node>,
}

impl ReleaseEntry {
    pub fn from_node(node: &Node) -> Result<Self> {
        let version = node
            .get(VERSION)
            .and_then(Node::as_str)
            .ok_or_else(|| CoreError::InvalidRelease {
                version: String::new(),
                message: "entry has no version".to_string(),
            })?;
        let text = |key: &str| {
            node.get(key)
                .and_then(Node::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Ok(Self {
            version: version.to_string(),
            min_channel_server_version: text(MIN_CHANNEL_SERVER_VERSION),
            max_channel_server_version: text(MAX_CHANNEL_SERVER_VERSION),
            charts: node.get(CHARTS).map(ReferenceGroup::from_node),
            server_args: node.get(SERVER_ARGS).map(ReferenceGroup::from_node),
            agent_args: node.get(AGENT_ARGS).map(ReferenceGroup::from_node),
            feature_versions: node.get(FEATURE_VERSIONS).cloned(),
        })
    }

    pub fn to_node(&self) -> Node {
        let mut entries = vec![
            (Node::scalar(VERSION), Node::scalar(&self.version)),
            (
                Node::scalar(MIN_CHANNEL_SERVER_VERSION),
                Node::scalar(&self.min_channel_server_version),
            ),
            (
                Node::scalar(MAX_CHANNEL_SERVER_VERSION),
                Node::scalar(&self.max_channel_server_version),
            ),
        ];
        let groups = [
            (CHARTS, &self.charts),
            (SERVER_ARGS, &self.server_args),
            (AGENT_ARGS, &self.agent_args),
        ];
        for (key, group) in groups {
            if let Some(group) = group {
                entries.push((Node::scalar(key), group.to_node()));
            }
        }
        if let Some(feature_versions) = &self.feature_versions {
            entries.push((Node::scalar(FEATURE_VERSIONS), feature_versions.clone()));
        }
        Node::mapping(entries)
    }

    /// Build the entry for `version` that follows this one.
    ///
    /// Each table inherits this entry's table by reference under the name
    /// given in `names`; `charts` additionally pins every chart in
    /// `changed_charts`.
    pub fn successor(
        &self,
        version: &str,
        names: &GroupNames,
        changed_charts: &ChartSet,
    ) -> Result<Self> {
        let mut charts = self.inherit(CHARTS, self.charts.as_ref(), &names.charts)?;
        for (name, chart) in changed_charts {
            charts = charts.with_override(Node::scalar(name), chart_node(chart));
        }

        let server_args =
            self.inherit(SERVER_ARGS, self.server_args.as_ref(), &names.server_args)?;
        let agent_args =
            self.inherit(AGENT_ARGS, self.agent_args.as_ref(), &names.agent_args)?;

        let feature_versions = self.feature_versions.as_ref().map(|node| {
            match node.anchor.as_deref().or(node.alias_target()) {
                Some(name) => Node::alias(name),
                None => node.without_anchors(),
            }
        });

        Ok(Self {
            version: version.to_string(),
            min_channel_server_version: self.min_channel_server_version.clone(),
            max_channel_server_version: self.max_channel_server_version.clone(),
            charts: Some(charts),
            server_args: Some(server_args),
            agent_args: Some(agent_args),
            feature_versions,
        })
    }

    fn inherit(
        &self,
        key: &str,
        group: Option<&ReferenceGroup>,
        anchor: &str,
    ) -> Result<ReferenceGroup> {
        group
            .and_then(|group| group.successor(anchor))
            .ok_or_else(|| CoreError::InvalidRelease {
                version: self.version.clone(),
                message: format!("'{}' has no reference name to inherit from", key),
            })
    }
}

fn chart_node(chart: &ChartRecord) -> Node {
    Node::mapping(vec![
        (Node::scalar("repo"), Node::scalar(&chart.repo)),
        (Node::scalar(VERSION), Node::scalar(&chart.version)),
    ])
}
