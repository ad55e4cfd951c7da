//! Flow collection parser
//!
//! Parses single-line `[...]` / `{...}` values into [`Node`]s using pest.

use std::collections::HashSet;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::error::{CoreError, Result};
use crate::node::{Node, ScalarStyle};
use crate::parser::scalar;

#[derive(Parser)]
#[grammar = "flow.pest"]
struct FlowParser;

/// Parse the flow collection `text` found on line `number`.
///
/// Anchors declared inside the collection are added to `anchors`; aliases
/// must refer to an anchor declared before them.
pub(crate) fn parse(text: &str, number: usize, anchors: &mut HashSet<String>) -> Result<Node> {
    let mut pairs = FlowParser::parse(Rule::flow, text).map_err(|e| {
        CoreError::parse(
            number,
            format!(
                "invalid flow collection '{}': {} (flow collections must fit on one line)",
                text,
                e.variant.message()
            ),
        )
    })?;

    let mut builder = Builder { number, anchors };
    let collection = pairs
        .next()
        .and_then(|flow| flow.into_inner().find(|p| p.as_rule() != Rule::EOI))
        .ok_or_else(|| CoreError::parse(number, "empty flow collection"))?;
    builder.node(collection)
}

struct Builder<'a> {
    number: usize,
    anchors: &'a mut HashSet<String>,
}

impl Builder<'_> {
    fn node(&mut self, pair: Pair<'_, Rule>) -> Result<Node> {
        match pair.as_rule() {
            Rule::sequence => {
                let items = pair
                    .into_inner()
                    .map(|item| self.item(item))
                    .collect::<Result<Vec<_>>>()?;
                let mut node = Node::sequence(items);
                node.flow = true;
                Ok(node)
            }
            Rule::mapping => {
                let mut entries = Vec::new();
                for entry in pair.into_inner() {
                    let mut inner = entry.into_inner();
                    let key = match inner.next() {
                        Some(key) => scalar(key.as_str(), self.number)?,
                        None => return Err(self.unexpected("mapping entry without a key")),
                    };
                    let value = match inner.next() {
                        Some(value) => self.item(value)?,
                        None => Node::loaded_scalar(String::new(), ScalarStyle::Plain, String::new()),
                    };
                    entries.push((key, value));
                }
                let mut node = Node::mapping(entries);
                node.flow = true;
                Ok(node)
            }
            Rule::alias => {
                let name = pair.into_inner().next().map(|n| n.as_str()).unwrap_or_default();
                if !self.anchors.contains(name) {
                    return Err(CoreError::parse(
                        self.number,
                        format!("alias *{} refers to an undefined anchor", name),
                    ));
                }
                Ok(Node::alias(name))
            }
            Rule::double_quoted | Rule::single_quoted | Rule::plain => {
                scalar(pair.as_str(), self.number)
            }
            rule => Err(self.unexpected(format!("unexpected {:?}", rule))),
        }
    }

    /// A nested node with its optional anchor and tag
    fn item(&mut self, pair: Pair<'_, Rule>) -> Result<Node> {
        let mut anchor = None;
        let mut tag = None;
        let mut node = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::anchor => {
                    if anchor.is_some() {
                        return Err(CoreError::parse(
                            self.number,
                            format!("invalid anchor '{}'", inner.as_str()),
                        ));
                    }
                    anchor = inner.into_inner().next().map(|n| n.as_str().to_string());
                }
                Rule::tag => tag = Some(inner.as_str().to_string()),
                _ => node = Some(self.node(inner)?),
            }
        }

        let mut node = node.ok_or_else(|| self.unexpected("missing flow node"))?;
        node.tag = tag;
        if let Some(name) = anchor {
            // registered after the content, so a node cannot alias itself
            if !self.anchors.insert(name.clone()) {
                return Err(CoreError::parse(
                    self.number,
                    format!("duplicate anchor &{}", name),
                ));
            }
            node.anchor = Some(name);
        }
        Ok(node)
    }

    fn unexpected(&self, message: impl Into<String>) -> CoreError {
        CoreError::parse(self.number, message.into())
    }
}
