//! Structural document nodes
//!
//! A [`Node`] is a scalar, a sequence or a mapping, plus the YAML properties
//! that make up the manifest's reference graph: an optional declared
//! reference name (anchor) and alias nodes pointing back at one. Sharing is
//! never expressed through Rust references; an alias is a named edge that is
//! resolved against the document's anchor table.

/// Merge key used by inherit-and-override mappings
pub const MERGE_KEY: &str = "<<";

/// Tag the encoder prints on constructed merge keys
pub const MERGE_TAG: &str = "!!merge";

/// How a scalar was written in the source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// `|` or `>` block scalar; `header` keeps chomping/indent indicators
    Block { header: String, lines: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    /// Decoded value
    pub value: String,
    pub style: ScalarStyle,
    /// Text exactly as it appeared in the source, if loaded
    pub(crate) raw: Option<String>,
}

/// One `key: value` pair of a mapping
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Node,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar(Scalar),
    Sequence(Vec<Node>),
    Mapping(Vec<Entry>),
    /// Reference edge to the anchor with this name
    Alias(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Declared reference name
    pub anchor: Option<String>,
    pub tag: Option<String>,
    /// Written in flow style (`[a, b]`, `{a: b}`)
    pub flow: bool,
    /// Raw comment and blank lines preceding this node
    pub leading: Vec<String>,
    /// Comment trailing the node's first line
    pub comment: Option<String>,
    /// Column offset of block content relative to the owning key or dash
    pub(crate) indent: Option<usize>,
}

impl Node {
    fn from_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            anchor: None,
            tag: None,
            flow: false,
            leading: Vec::new(),
            comment: None,
            indent: None,
        }
    }

    /// A new plain string scalar; quoting is decided when encoding
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::from_kind(NodeKind::Scalar(Scalar {
            value: value.into(),
            style: ScalarStyle::Plain,
            raw: None,
        }))
    }

    pub(crate) fn loaded_scalar(value: String, style: ScalarStyle, raw: String) -> Self {
        Self::from_kind(NodeKind::Scalar(Scalar {
            value,
            style,
            raw: Some(raw),
        }))
    }

    pub fn sequence(items: Vec<Node>) -> Self {
        Self::from_kind(NodeKind::Sequence(items))
    }

    pub fn mapping(entries: Vec<(Node, Node)>) -> Self {
        Self::from_kind(NodeKind::Mapping(
            entries
                .into_iter()
                .map(|(key, value)| Entry { key, value })
                .collect(),
        ))
    }

    /// A reference edge to `target`
    pub fn alias(target: impl Into<String>) -> Self {
        Self::from_kind(NodeKind::Alias(target.into()))
    }

    /// The `<<` key of an inherit-and-override mapping
    pub fn merge_key() -> Self {
        let mut key = Self::loaded_scalar(
            MERGE_KEY.to_string(),
            ScalarStyle::Plain,
            MERGE_KEY.to_string(),
        );
        key.tag = Some(MERGE_TAG.to_string());
        key
    }

    /// A mapping inheriting `target` with `overrides` layered on top
    pub fn inherit(target: impl Into<String>, overrides: Vec<(Node, Node)>) -> Self {
        let mut entries = Vec::with_capacity(overrides.len() + 1);
        entries.push((Self::merge_key(), Self::alias(target)));
        entries.extend(overrides);
        Self::mapping(entries)
    }

    pub fn with_anchor(mut self, name: impl Into<String>) -> Self {
        self.anchor = Some(name.into());
        self
    }

    /// Scalar value, if this is a scalar
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar(scalar) => Some(scalar.value.as_str()),
            _ => None,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        match &self.kind {
            NodeKind::Mapping(entries) => entries,
            _ => &[],
        }
    }

    pub fn items(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Sequence(items) => items,
            _ => &[],
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, NodeKind::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, NodeKind::Sequence(_))
    }

    /// Target of this node if it is an alias
    pub fn alias_target(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Alias(target) => Some(target.as_str()),
            _ => None,
        }
    }

    /// Value stored under a scalar key
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries()
            .iter()
            .find(|entry| entry.key.as_str() == Some(key))
            .map(|entry| &entry.value)
    }

    pub(crate) fn is_merge_key(&self) -> bool {
        self.as_str() == Some(MERGE_KEY)
    }

    /// Anchor inherited through a `<<: *name` entry
    pub fn merge_target(&self) -> Option<&str> {
        self.entries()
            .iter()
            .find(|entry| entry.key.is_merge_key())
            .and_then(|entry| entry.value.alias_target())
    }

    /// Visit every anchor declared in this subtree, in document order
    pub fn for_each_anchor<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        if let Some(anchor) = &self.anchor {
            f(anchor.as_str());
        }
        match &self.kind {
            NodeKind::Sequence(items) => {
                for item in items {
                    item.for_each_anchor(f);
                }
            }
            NodeKind::Mapping(entries) => {
                for entry in entries {
                    entry.key.for_each_anchor(f);
                    entry.value.for_each_anchor(f);
                }
            }
            NodeKind::Scalar(_) | NodeKind::Alias(_) => {}
        }
    }

    /// Visit every alias target in this subtree, in document order
    pub fn for_each_alias<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match &self.kind {
            NodeKind::Alias(target) => f(target.as_str()),
            NodeKind::Sequence(items) => {
                for item in items {
                    item.for_each_alias(f);
                }
            }
            NodeKind::Mapping(entries) => {
                for entry in entries {
                    entry.key.for_each_alias(f);
                    entry.value.for_each_alias(f);
                }
            }
            NodeKind::Scalar(_) => {}
        }
    }

    /// Deep copy with every declared anchor removed, so the copy can live
    /// alongside the original without redeclaring names
    pub fn without_anchors(&self) -> Self {
        let mut copy = self.clone();
        copy.strip_anchors();
        copy
    }

    fn strip_anchors(&mut self) {
        self.anchor = None;
        match &mut self.kind {
            NodeKind::Sequence(items) => items.iter_mut().for_each(Node::strip_anchors),
            NodeKind::Mapping(entries) => {
                for entry in entries {
                    entry.key.strip_anchors();
                    entry.value.strip_anchors();
                }
            }
            NodeKind::Scalar(_) | NodeKind::Alias(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherit_builds_merge_entry() {
        let node = Node::inherit(
            "charts-v1",
            vec![(Node::scalar("rke2-canal"), Node::scalar("v3"))],
        )
        .with_anchor("chartsv2");

        assert_eq!(node.anchor.as_deref(), Some("chartsv2"));
        assert_eq!(node.merge_target(), Some("charts-v1"));
        assert_eq!(node.entries().len(), 2);
        assert_eq!(node.entries()[0].key.tag.as_deref(), Some(MERGE_TAG));
        assert_eq!(node.get("rke2-canal").and_then(Node::as_str), Some("v3"));
    }

    #[test]
    fn test_anchor_and_alias_walks() {
        let node = Node::mapping(vec![
            (
                Node::scalar("a"),
                Node::mapping(vec![(Node::scalar("x"), Node::scalar("1"))]).with_anchor("first"),
            ),
            (Node::scalar("b"), Node::alias("first")),
            (Node::scalar("c"), Node::inherit("first", vec![]).with_anchor("second")),
        ]);

        let mut anchors = Vec::new();
        node.for_each_anchor(&mut |a| anchors.push(a));
        assert_eq!(anchors, vec!["first", "second"]);

        let mut aliases = Vec::new();
        node.for_each_alias(&mut |a| aliases.push(a));
        assert_eq!(aliases, vec!["first", "first"]);
    }

    #[test]
    fn test_without_anchors() {
        let node = Node::mapping(vec![(
            Node::scalar("a"),
            Node::scalar("1").with_anchor("inner"),
        )])
        .with_anchor("outer");

        let copy = node.without_anchors();
        let mut anchors = Vec::new();
        copy.for_each_anchor(&mut |a| anchors.push(a));
        assert!(anchors.is_empty());
        assert_eq!(copy.get("a").and_then(Node::as_str), Some("1"));
    }
}
