//! Predecessor command - show which release a new version follows

use console::style;
use std::path::Path;

use kdm_core::{DocumentGraph, ReleaseVersion};

use super::read_manifest;
use crate::error::Result;

pub fn run(release: &str, file: &Path, product: &str) -> Result<()> {
    let version = ReleaseVersion::parse(release, product)?;
    let graph = DocumentGraph::load(&read_manifest(file)?)?;
    let predecessor = version.predecessor(&graph.versions())?.to_string();

    println!("{}", predecessor);

    if !graph.contains_version(&predecessor) {
        eprintln!(
            "{} {} is not recorded in {}",
            style("⚠").yellow(),
            predecessor,
            file.display()
        );
    }

    Ok(())
}
