//! Charts command - print chart pins changed between two releases

use std::path::Path;

use kdm_core::{DocumentGraph, ReleaseVersion};

use super::{chart_source, read_manifest, runtime};
use crate::error::{CliError, Result};

/// Print the charts `release` adds or bumps compared to `previous`.
///
/// Without `previous` the predecessor is resolved, using the manifest at
/// `file` as history when given.
pub fn run(
    release: &str,
    previous: Option<&str>,
    file: Option<&Path>,
    product: &str,
    config: Option<&Path>,
) -> Result<()> {
    let version = ReleaseVersion::parse(release, product)?;

    let previous = match previous {
        Some(previous) => ReleaseVersion::parse(previous, product)?,
        None => {
            let history: Vec<String> = match file {
                Some(file) => DocumentGraph::load(&read_manifest(file)?)?
                    .versions()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                None => Vec::new(),
            };
            version.predecessor(&history)?
        }
    };
    tracing::debug!("diffing {} against {}", version, previous);

    let source = chart_source(config, product)?;
    let changed = runtime()?.block_on(kdm_core::diff(
        &source,
        &version.to_string(),
        &previous.to_string(),
    ))?;

    let yaml = serde_yaml::to_string(&changed)
        .map_err(|e| CliError::internal(format!("Failed to encode charts: {}", e)))?;
    print!("{}", yaml);

    Ok(())
}
