//! Block YAML encoder for [`Node`] trees
//!
//! Loaded scalars are written back exactly as read. Constructed scalars are
//! quoted the way `serde_yaml` quotes strings. Constructed merge keys are
//! written in the tagged `!!merge <<` form general-purpose YAML encoders
//! print, and empty block collections as `{}`/`[]`. The serializer's
//! fix-up pass reduces both to what the manifests are written with.

use crate::node::{Entry, Node, NodeKind, Scalar, ScalarStyle};

const INDENT: usize = 2;

/// Encoder output: lines plus the positions of synthesized empty markers
#[derive(Debug, Default)]
pub(crate) struct Emitted {
    pub lines: Vec<String>,
    /// Indexes into `lines` ending in an empty-content marker
    pub empty_markers: Vec<usize>,
}

pub(crate) fn emit(preamble: &[String], root: &Node, trailing: &[String]) -> Emitted {
    let mut emitter = Emitter::default();
    emitter.lines.extend(preamble.iter().cloned());
    emitter.lines.extend(root.leading.iter().cloned());

    match &root.kind {
        NodeKind::Mapping(entries) if !root.flow && !entries.is_empty() => {
            emitter.mapping(entries, 0, None)
        }
        NodeKind::Sequence(items) if !root.flow && !items.is_empty() => emitter.sequence(items, 0),
        _ => {
            let line = emitter.inline(root);
            emitter.lines.push(line);
        }
    }

    emitter.lines.extend(trailing.iter().cloned());
    Emitted {
        lines: emitter.lines,
        empty_markers: emitter.empty_markers,
    }
}

#[derive(Default)]
struct Emitter {
    lines: Vec<String>,
    empty_markers: Vec<usize>,
}

impl Emitter {
    /// Write mapping entries at `indent`. `first_prefix` replaces the
    /// indentation of the first key, for compact `- key: value` items.
    fn mapping(&mut self, entries: &[Entry], indent: usize, first_prefix: Option<String>) {
        let pad = " ".repeat(indent);
        let mut first_prefix = first_prefix;
        for entry in entries {
            self.lines.extend(entry.key.leading.iter().cloned());
            let prefix = first_prefix.take().unwrap_or_else(|| pad.clone());
            let mut key = String::new();
            if let Some(tag) = &entry.key.tag {
                key.push_str(tag);
                key.push(' ');
            }
            key.push_str(&scalar_text(&entry.key));
            self.value(format!("{}{}:", prefix, key), &entry.value, indent);
        }
    }

    fn sequence(&mut self, items: &[Node], indent: usize) {
        let pad = " ".repeat(indent);
        for item in items {
            self.lines.extend(item.leading.iter().cloned());
            let compact = item.anchor.is_none() && item.tag.is_none() && item.comment.is_none();
            match &item.kind {
                NodeKind::Mapping(entries) if compact && !item.flow && !entries.is_empty() => {
                    self.mapping(entries, indent + INDENT, Some(format!("{}- ", pad)));
                }
                _ => self.value(format!("{}-", pad), item, indent),
            }
        }
    }

    /// Write `node` after `head` (`key:` or `-`) owned by column `owner`
    fn value(&mut self, head: String, node: &Node, owner: usize) {
        let mut line = head;
        if let Some(anchor) = &node.anchor {
            line.push_str(" &");
            line.push_str(anchor);
        }
        if let Some(tag) = &node.tag {
            line.push(' ');
            line.push_str(tag);
        }

        let child = owner + node.indent.unwrap_or(INDENT);
        match &node.kind {
            NodeKind::Mapping(entries) if !node.flow && !entries.is_empty() => {
                self.push_with_comment(line, node);
                self.mapping(entries, child, None);
            }
            NodeKind::Sequence(items) if !node.flow && !items.is_empty() => {
                self.push_with_comment(line, node);
                self.sequence(items, child);
            }
            NodeKind::Mapping(_) | NodeKind::Sequence(_) if !node.flow => {
                line.push_str(if node.is_mapping() { " {}" } else { " []" });
                self.empty_markers.push(self.lines.len());
                self.push_with_comment(line, node);
            }
            NodeKind::Scalar(Scalar {
                style: ScalarStyle::Block { header, lines },
                ..
            }) => {
                line.push(' ');
                line.push_str(header);
                self.push_with_comment(line, node);
                let pad = " ".repeat(child);
                for text in lines {
                    if text.is_empty() {
                        self.lines.push(String::new());
                    } else {
                        self.lines.push(format!("{}{}", pad, text));
                    }
                }
            }
            _ => {
                let text = self.inline(node);
                if !text.is_empty() {
                    line.push(' ');
                    line.push_str(&text);
                }
                self.push_with_comment(line, node);
            }
        }
    }

    fn push_with_comment(&mut self, mut line: String, node: &Node) {
        if let Some(comment) = &node.comment {
            line.push(' ');
            line.push_str(comment);
        }
        self.lines.push(line);
    }

    /// Single-line rendering of scalars, aliases and flow collections
    fn inline(&self, node: &Node) -> String {
        match &node.kind {
            NodeKind::Scalar(_) => scalar_text(node),
            NodeKind::Alias(target) => format!("*{}", target),
            NodeKind::Sequence(items) => {
                let items: Vec<String> = items.iter().map(|item| self.flow_item(item)).collect();
                format!("[{}]", items.join(", "))
            }
            NodeKind::Mapping(entries) => {
                let entries: Vec<String> = entries
                    .iter()
                    .map(|e| {
                        let value = self.flow_item(&e.value);
                        if value.is_empty() {
                            format!("{}:", scalar_text(&e.key))
                        } else {
                            format!("{}: {}", scalar_text(&e.key), value)
                        }
                    })
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
        }
    }

    /// A node nested in a flow collection, with its anchor and tag
    fn flow_item(&self, node: &Node) -> String {
        let mut parts = Vec::new();
        if let Some(anchor) = &node.anchor {
            parts.push(format!("&{}", anchor));
        }
        if let Some(tag) = &node.tag {
            parts.push(tag.clone());
        }
        let text = self.inline(node);
        if !text.is_empty() {
            parts.push(text);
        }
        parts.join(" ")
    }
}

fn scalar_text(node: &Node) -> String {
    match &node.kind {
        NodeKind::Scalar(scalar) => match &scalar.raw {
            Some(raw) => raw.clone(),
            None => quote(&scalar.value),
        },
        NodeKind::Alias(target) => format!("*{}", target),
        _ => String::new(),
    }
}

/// Render a constructed string the way the YAML encoder would
pub(crate) fn quote(value: &str) -> String {
    match serde_yaml::to_string(value) {
        Ok(encoded) => {
            let encoded = encoded.trim_end_matches('\n');
            if encoded.contains('\n') {
                double_quoted(value)
            } else {
                encoded.to_string()
            }
        }
        Err(_) => double_quoted(value),
    }
}

fn double_quoted(value: &str) -> String {
    // JSON strings are valid YAML double-quoted scalars
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}
