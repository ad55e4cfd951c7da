//! Release channel manifest evolution engine
//!
//! Adds newly published distribution releases to a channel manifest. Each
//! new entry is placed after the release it follows and inherits that
//! release's tables by YAML reference, pinning only the charts whose version
//! changed. Existing entries and their anchors are written back untouched.
//!
//! ```no_run
//! # async fn run(source: kdm_core::StaticChartSource) -> kdm_core::Result<()> {
//! let manifest = std::fs::read("channels-rke2.yaml")?;
//! let updated = kdm_core::update_manifest(&manifest, &["v1.33.2+rke2r1"], "rke2", source).await?;
//! std::fs::write("channels-rke2.yaml", updated)?;
//! # Ok(())
//! # }
//! ```

pub mod charts;
pub mod document;
pub mod editor;
mod emitter;
pub mod error;
mod flow;
pub mod node;
mod parser;
pub mod release;
mod serializer;
pub mod version;

pub use charts::{ChartRecord, ChartSet, ChartSource, StaticChartSource, diff, diff_chart_sets};
pub use document::{DocumentGraph, RELEASES_KEY, display_name};
pub use editor::{AddedRelease, ManifestEditor, update_manifest};
pub use error::{BoxError, CoreError, Result};
pub use node::{Entry, Node, NodeKind, Scalar, ScalarStyle};
pub use release::{GroupNames, ReferenceGroup, ReleaseEntry};
pub use version::{DEFAULT_PRODUCT, ReleaseVersion};
