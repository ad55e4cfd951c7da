//! Loader for the block YAML used by channel manifests
//!
//! Builds [`Node`] trees that keep anchors, aliases, merge keys, tags,
//! comments and the exact source text of scalars, so an untouched subtree
//! encodes back to what was read. Supported input:
//! - block mappings and sequences, including compact `- key: value` items
//!   and sequences written at their parent key's indentation
//! - plain, single and double quoted scalars, `|`/`>` block scalars
//! - single-line flow collections
//! - a leading `---` marker, `%` directives and a trailing `...`

use std::collections::HashSet;

use crate::error::{CoreError, Result};
use crate::flow;
use crate::node::{Entry, Node, NodeKind, ScalarStyle};

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    /// 1-based line number
    number: usize,
    indent: usize,
    text: &'a str,
}

impl<'a> Line<'a> {
    fn split(number: usize, raw: &'a str) -> Self {
        let text = raw.trim_start_matches(' ');
        Self {
            number,
            indent: raw.len() - text.len(),
            text: text.trim_end(),
        }
    }

    fn is_trivia(&self) -> bool {
        self.text.is_empty() || self.text.starts_with('#')
    }
}

/// A loaded document before manifest-level validation
#[derive(Debug)]
pub(crate) struct ParsedDocument {
    pub preamble: Vec<String>,
    pub root: Node,
    pub trailing: Vec<String>,
    pub anchors: HashSet<String>,
}

pub(crate) fn parse(input: &str) -> Result<ParsedDocument> {
    let mut parser = Parser::new(input)?;
    parser.document()
}

struct Parser<'a> {
    raw: Vec<&'a str>,
    lines: Vec<Line<'a>>,
    pos: usize,
    /// Comment and blank lines waiting for the next node
    pending: Vec<String>,
    anchors: HashSet<String>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self> {
        let raw: Vec<&str> = input.lines().collect();
        let mut lines = Vec::with_capacity(raw.len());
        for (i, text) in raw.iter().enumerate() {
            let line = Line::split(i + 1, text);
            if line.text.starts_with('\t') {
                return Err(CoreError::parse(line.number, "tabs are not allowed in indentation"));
            }
            lines.push(line);
        }
        Ok(Self {
            raw,
            lines,
            pos: 0,
            pending: Vec::new(),
            anchors: HashSet::new(),
        })
    }

    fn document(&mut self) -> Result<ParsedDocument> {
        let mut preamble = Vec::new();
        loop {
            self.skip_trivia();
            let Some(line) = self.peek() else { break };
            if line.indent == 0 && (line.text.starts_with('%') || line.text == "---") {
                preamble.append(&mut self.pending);
                preamble.push(self.raw[self.pos].trim_end().to_string());
                self.pos += 1;
                continue;
            }
            if line.indent == 0 && line.text.starts_with("--- ") {
                return Err(CoreError::parse(
                    line.number,
                    "content on the document start line is not supported",
                ));
            }
            break;
        }

        let Some(first) = self.peek() else {
            return Err(CoreError::parse(0, "document is empty"));
        };
        let leading = std::mem::take(&mut self.pending);
        let mut root = self.block_collection(first.indent)?;
        root.leading = leading;

        self.skip_trivia();
        if let Some(line) = self.peek() {
            if line.text == "..." {
                self.pos += 1;
                self.skip_trivia();
            }
        }
        if let Some(line) = self.peek() {
            let message = if line.text == "---" {
                "multiple documents are not supported".to_string()
            } else {
                format!("unexpected content '{}'", line.text)
            };
            return Err(CoreError::parse(line.number, message));
        }

        Ok(ParsedDocument {
            preamble,
            root,
            trailing: std::mem::take(&mut self.pending),
            anchors: std::mem::take(&mut self.anchors),
        })
    }

    // ============ Line handling ============

    fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    /// Move comment and blank lines into `pending`
    fn skip_trivia(&mut self) {
        while let Some(line) = self.peek() {
            if !line.is_trivia() {
                break;
            }
            self.pending.push(self.raw[self.pos].trim_end().to_string());
            self.pos += 1;
        }
    }

    fn next_content(&mut self) -> Option<Line<'a>> {
        self.skip_trivia();
        self.peek()
    }

    // ============ Block collections ============

    fn block_collection(&mut self, indent: usize) -> Result<Node> {
        let Some(line) = self.peek() else {
            return Err(CoreError::parse(0, "unexpected end of document"));
        };
        if is_sequence_item(line.text) {
            self.sequence(indent)
        } else if split_key(line.text).is_some() {
            self.mapping(indent)
        } else {
            Err(CoreError::parse(
                line.number,
                format!("expected a mapping or sequence, found '{}'", line.text),
            ))
        }
    }

    fn mapping(&mut self, indent: usize) -> Result<Node> {
        let mut entries: Vec<Entry> = Vec::new();

        while let Some(line) = self.next_content() {
            if line.indent < indent || (line.indent == indent && is_sequence_item(line.text)) {
                break;
            }
            if line.indent == 0 && (line.text == "---" || line.text == "...") {
                break;
            }
            if line.indent > indent {
                return Err(CoreError::parse(
                    line.number,
                    "unexpected indentation (multi-line scalars are not supported)",
                ));
            }

            let (key_text, rest) = split_key(line.text).ok_or_else(|| {
                CoreError::parse(line.number, format!("expected 'key: value', found '{}'", line.text))
            })?;
            let mut key = scalar(key_text, line.number)?;
            key.leading = std::mem::take(&mut self.pending);

            if let Some(name) = key.as_str() {
                if entries.iter().any(|e| e.key.as_str() == Some(name)) {
                    return Err(CoreError::parse(line.number, format!("duplicate key '{}'", name)));
                }
            }

            self.pos += 1;
            let value = self.value(rest, indent, line.number, true)?;
            entries.push(Entry { key, value });
        }

        let mut node = Node::mapping(Vec::new());
        node.kind = NodeKind::Mapping(entries);
        Ok(node)
    }

    fn sequence(&mut self, indent: usize) -> Result<Node> {
        let mut items = Vec::new();

        while let Some(line) = self.next_content() {
            if line.indent < indent || !is_sequence_item(line.text) {
                break;
            }
            if line.indent > indent {
                return Err(CoreError::parse(line.number, "unexpected indentation"));
            }

            let leading = std::mem::take(&mut self.pending);
            let after_dash = &line.text[1..];
            let rest = after_dash.trim_start();
            let column = indent + 1 + (after_dash.len() - rest.len());

            let mut item = if rest.is_empty() || rest.starts_with('#') || is_property(rest) {
                self.pos += 1;
                self.value(rest, indent, line.number, false)?
            } else if is_sequence_item(rest) || split_key(rest).is_some() {
                // compact item: reread the rest of the line as its own block
                self.lines[self.pos] = Line {
                    number: line.number,
                    indent: column,
                    text: rest,
                };
                self.block_collection(column)?
            } else {
                self.pos += 1;
                self.value(rest, indent, line.number, false)?
            };
            item.leading = leading;
            items.push(item);
        }

        Ok(Node::sequence(items))
    }

    // ============ Values ============

    /// Parse the text following `key:` or `- `. `owner` is the column of the
    /// key or dash; block content must be indented past it.
    fn value(&mut self, text: &'a str, owner: usize, number: usize, in_mapping: bool) -> Result<Node> {
        let (anchor, tag, text) = properties(text, number)?;
        let (text, comment) = split_comment(text);

        let mut node = if text.is_empty() {
            self.block_value(owner, in_mapping)?
        } else if let Some(target) = text.strip_prefix('*') {
            if target.is_empty() || target.contains(char::is_whitespace) {
                return Err(CoreError::parse(number, format!("invalid alias '{}'", text)));
            }
            if !self.anchors.contains(target) {
                return Err(CoreError::parse(
                    number,
                    format!("alias *{} refers to an undefined anchor", target),
                ));
            }
            Node::alias(target)
        } else if text.starts_with('|') || text.starts_with('>') {
            self.block_scalar(text, owner, number)?
        } else if text.starts_with('[') || text.starts_with('{') {
            flow::parse(text, number, &mut self.anchors)?
        } else {
            scalar(text, number)?
        };

        if anchor.is_some() && node.anchor.is_none() {
            node.anchor = anchor;
        }
        if tag.is_some() {
            node.tag = tag;
        }
        if comment.is_some() {
            node.comment = comment;
        }

        if let Some(name) = &node.anchor {
            if !self.anchors.insert(name.clone()) {
                return Err(CoreError::parse(number, format!("duplicate anchor &{}", name)));
            }
        }

        Ok(node)
    }

    /// Content on the following lines, or an empty scalar
    fn block_value(&mut self, owner: usize, in_mapping: bool) -> Result<Node> {
        let start = self.pos;
        let pending = self.pending.len();

        match self.next_content() {
            Some(line) if line.indent > owner => {
                let mut node = self.block_collection(line.indent)?;
                node.indent = Some(line.indent - owner);
                Ok(node)
            }
            Some(line) if in_mapping && line.indent == owner && is_sequence_item(line.text) => {
                let mut node = self.sequence(owner)?;
                node.indent = Some(0);
                Ok(node)
            }
            _ => {
                // trivia belongs to whatever comes next
                self.pos = start;
                self.pending.truncate(pending);
                Ok(Node::loaded_scalar(String::new(), ScalarStyle::Plain, String::new()))
            }
        }
    }

    fn block_scalar(&mut self, header: &str, owner: usize, number: usize) -> Result<Node> {
        let valid_header = header.len() <= 3
            && header[1..]
                .chars()
                .all(|c| c == '+' || c == '-' || c.is_ascii_digit());
        if !valid_header {
            return Err(CoreError::parse(number, format!("invalid block scalar header '{}'", header)));
        }

        let mut body: Vec<&str> = Vec::new();
        let mut end = self.pos;
        let mut content_indent = None;
        let mut i = self.pos;
        while let Some(line) = self.lines.get(i) {
            if line.text.is_empty() {
                body.push("");
            } else if line.indent > owner {
                content_indent.get_or_insert(line.indent);
                body.push(self.raw[i]);
                end = i + 1;
            } else {
                break;
            }
            i += 1;
        }
        // trailing blank lines stay with the surrounding document
        body.truncate(end.saturating_sub(self.pos));
        self.pos = end;

        let content_indent = content_indent.unwrap_or(owner + 2);
        let lines: Vec<String> = body
            .iter()
            .map(|l| {
                if l.trim().is_empty() {
                    String::new()
                } else {
                    l.get(content_indent..).unwrap_or("").trim_end().to_string()
                }
            })
            .collect();

        let mut source = header.to_string();
        for l in &lines {
            source.push_str("\n  ");
            source.push_str(l);
        }
        // chomping applies to the final line break
        source.push('\n');
        let value: String = serde_yaml::from_str(&source)
            .map_err(|e| CoreError::parse(number, format!("invalid block scalar: {}", e)))?;

        let mut node = Node::loaded_scalar(
            value,
            ScalarStyle::Block {
                header: header.to_string(),
                lines,
            },
            header.to_string(),
        );
        node.indent = Some(content_indent - owner);
        Ok(node)
    }
}

// ============ Scalars and tokens ============

fn is_sequence_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ")
}

fn is_property(text: &str) -> bool {
    text.starts_with('&') || text.starts_with('!')
}

/// Split leading `&anchor` / `!tag` properties off a value
fn properties(mut text: &str, number: usize) -> Result<(Option<String>, Option<String>, &str)> {
    let mut anchor = None;
    let mut tag = None;
    loop {
        text = text.trim_start();
        let Some(first) = text.chars().next() else { break };
        if first != '&' && first != '!' {
            break;
        }
        let end = text.find(char::is_whitespace).unwrap_or(text.len());
        let token = &text[..end];
        if first == '&' {
            let name = &token[1..];
            if name.is_empty() || anchor.is_some() {
                return Err(CoreError::parse(number, format!("invalid anchor '{}'", token)));
            }
            anchor = Some(name.to_string());
        } else {
            tag = Some(token.to_string());
        }
        text = &text[end..];
    }
    Ok((anchor, tag, text))
}

/// Split a trailing ` # comment` off a value, ignoring `#` inside quotes
fn split_comment(text: &str) -> (&str, Option<String>) {
    if text.starts_with('#') {
        return ("", Some(text.to_string()));
    }
    let bytes = text.as_bytes();
    let mut quote = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(b'"') if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => {
                if i == 0 || matches!(bytes[i - 1], b' ' | b'[' | b'{' | b',' | b':') {
                    quote = Some(b);
                }
            }
            None if b == b'#' && i > 0 && bytes[i - 1] == b' ' => {
                return (text[..i].trim_end(), Some(text[i..].to_string()));
            }
            None => {}
        }
        i += 1;
    }
    (text.trim_end(), None)
}

/// End index (exclusive) of a quoted scalar starting at byte 0
fn quoted_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let quote = *bytes.first()?;
    let mut i = 1;
    while i < bytes.len() {
        let b = bytes[i];
        if quote == b'"' && b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

/// Split `key: rest` into key text and the (possibly empty) rest
fn split_key(text: &str) -> Option<(&str, &str)> {
    if text.starts_with(['[', '{', '#', '&', '*', '!', '|', '>', '?']) {
        return None;
    }
    if text.starts_with(['"', '\'']) {
        let end = quoted_end(text)?;
        let rest = text[end..].trim_start();
        let rest = rest.strip_prefix(':')?;
        if !rest.is_empty() && !rest.starts_with(' ') {
            return None;
        }
        return Some((&text[..end], rest.trim_start()));
    }

    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && i > 0 && bytes[i - 1] == b' ' {
            return None;
        }
        if b == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' ') {
            let key = text[..i].trim_end();
            if key.is_empty() {
                return None;
            }
            return Some((key, text[i + 1..].trim_start()));
        }
    }
    None
}

/// Build a scalar node from its source text
pub(crate) fn scalar(text: &str, number: usize) -> Result<Node> {
    let first = text.chars().next();
    match first {
        Some('"') | Some('\'') => {
            let end = quoted_end(text).ok_or_else(|| {
                CoreError::parse(number, "unterminated quoted scalar (multi-line scalars are not supported)")
            })?;
            if end != text.len() {
                return Err(CoreError::parse(
                    number,
                    format!("unexpected text after quoted scalar '{}'", text),
                ));
            }
            let (style, value) = if first == Some('"') {
                let value: String = serde_yaml::from_str(text)
                    .map_err(|e| CoreError::parse(number, format!("invalid quoted scalar: {}", e)))?;
                (ScalarStyle::DoubleQuoted, value)
            } else {
                (
                    ScalarStyle::SingleQuoted,
                    text[1..text.len() - 1].replace("''", "'"),
                )
            };
            Ok(Node::loaded_scalar(value, style, text.to_string()))
        }
        _ => Ok(Node::loaded_scalar(
            text.to_string(),
            ScalarStyle::Plain,
            text.to_string(),
        )),
    }
}
