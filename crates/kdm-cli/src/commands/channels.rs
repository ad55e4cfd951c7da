//! Channels command - add releases to a channel manifest

use console::style;
use std::io::Write;
use std::path::Path;

use kdm_core::{CoreError, ManifestEditor, ReleaseVersion};

use super::{chart_source, read_manifest, runtime};
use crate::error::{CliError, Result};

pub fn run(
    file: &Path,
    releases: &[String],
    product: &str,
    config: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let releases: Vec<&str> = releases
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    if releases.is_empty() {
        return Err(CliError::input("no release versions given"));
    }
    for release in &releases {
        ReleaseVersion::parse(release, product)?;
    }

    let manifest = read_manifest(file)?;
    let source = chart_source(config, product)?;

    let (updated, added) = runtime()?.block_on(async {
        let mut editor = ManifestEditor::load(&manifest, source)?.with_product(product);
        let added = editor.add_releases(releases.as_slice()).await?;
        Ok::<_, CoreError>((editor.encode()?, added))
    })?;

    if dry_run {
        std::io::stdout().write_all(&updated)?;
    } else {
        std::fs::write(file, &updated).map_err(|e| CliError::io_at(file, e))?;
    }

    for release in &added {
        let line = format!(
            "{} Added {} after {} ({} chart {})",
            style("✓").green(),
            style(&release.version).bold(),
            release.predecessor,
            release.charts.len(),
            if release.charts.len() == 1 { "update" } else { "updates" }
        );
        // keep stdout clean for the manifest on dry runs
        if dry_run {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
    if !dry_run {
        println!("Wrote {}", file.display());
    }

    Ok(())
}
