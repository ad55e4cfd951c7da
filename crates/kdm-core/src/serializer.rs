//! Manifest text output
//!
//! Encodes a [`DocumentGraph`] and post-processes the text:
//! 1. merge keys lose the explicit `!!merge` tag the encoder adds
//! 2. synthesized ` {}` / ` []` markers on tables with no local content go
//! 3. collision-safe reference names become their display names

use std::collections::BTreeMap;

use regex::Regex;

use crate::document::DocumentGraph;
use crate::error::{CoreError, Result};
use crate::node::{MERGE_KEY, MERGE_TAG};

pub fn encode(graph: &DocumentGraph) -> Result<Vec<u8>> {
    let emitted = graph.emit();
    let mut lines = emitted.lines;
    strip_empty_markers(&mut lines, &emitted.empty_markers);

    let mut text = lines.join("\n");
    text.push('\n');

    let text = strip_merge_tags(&text);
    let text = apply_renames(&text, graph.renames())?;
    Ok(text.into_bytes())
}

fn strip_merge_tags(text: &str) -> String {
    text.replace(&format!("{} {}", MERGE_TAG, MERGE_KEY), MERGE_KEY)
}

fn strip_empty_markers(lines: &mut [String], markers: &[usize]) {
    for &index in markers {
        let Some(line) = lines.get_mut(index) else {
            continue;
        };
        for marker in [" {}", " []"] {
            if let Some(stripped) = line.strip_suffix(marker) {
                *line = stripped.to_string();
                break;
            }
        }
    }
}

/// Replace every `&name` / `*name` token of a renamed reference.
///
/// Only whole tokens match, so a name that is a prefix of another
/// (`chartsv1332rke2r1` vs `chartsv1332rke2r12`) is left alone.
fn apply_renames(text: &str, renames: &BTreeMap<String, String>) -> Result<String> {
    let mut out = text.to_string();
    for (from, to) in renames {
        let pattern = format!(r"([&*]){}([\s,\]}}]|$)", regex::escape(from));
        let re = Regex::new(&pattern).map_err(|e| CoreError::Encode {
            message: format!("invalid rename pattern for '{}': {}", from, e),
        })?;
        let replacement = format!("${{1}}{}${{2}}", to);
        out = re.replace_all(&out, replacement.as_str()).into_owned();
    }
    Ok(out)
}
